//! Fixed-advance text layout
//!
//! Used where no font system is available (headless hosts, tests). Every
//! character is assumed to be `char_width` pixels wide.

use super::TextLayout;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceLayout {
    pub char_width: f32,
    pub line_height: f32,
}

impl MonospaceLayout {
    pub fn new(char_width: f32, line_height: f32) -> Self {
        Self {
            char_width,
            line_height,
        }
    }

    fn max_chars(&self, max_width: f32) -> usize {
        if self.char_width <= 0.0 {
            return usize::MAX;
        }
        ((max_width / self.char_width).floor() as usize).max(1)
    }
}

impl Default for MonospaceLayout {
    fn default() -> Self {
        Self::new(8.0, 18.0)
    }
}

impl TextLayout for MonospaceLayout {
    fn wrap(&mut self, text: &str, max_width: f32) -> Vec<String> {
        let max_chars = self.max_chars(max_width);
        let mut lines = Vec::new();

        for paragraph in text.split('\n') {
            let mut line = String::new();
            let mut line_chars = 0usize;

            for word in paragraph.split_whitespace() {
                let mut word: Vec<char> = word.chars().collect();

                // Words longer than a line are broken by character
                while word.len() > max_chars {
                    if line_chars > 0 {
                        lines.push(std::mem::take(&mut line));
                        line_chars = 0;
                    }
                    let rest = word.split_off(max_chars);
                    lines.push(word.into_iter().collect());
                    word = rest;
                }

                let needed = if line_chars == 0 {
                    word.len()
                } else {
                    line_chars + 1 + word.len()
                };

                if needed > max_chars {
                    lines.push(std::mem::take(&mut line));
                    line_chars = 0;
                }
                if line_chars > 0 {
                    line.push(' ');
                    line_chars += 1;
                }
                line_chars += word.len();
                line.extend(word);
            }

            lines.push(line);
        }

        lines
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(text: &str, chars: usize) -> Vec<String> {
        MonospaceLayout::new(1.0, 10.0).wrap(text, chars as f32)
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap("Hello there", 20), vec!["Hello there"]);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn breaks_words_longer_than_a_line() {
        assert_eq!(wrap("abcdefghij kl", 4), vec!["abcd", "efgh", "ij", "kl"]);
    }

    #[test]
    fn keeps_explicit_newlines() {
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
    }

    #[test]
    fn emoji_count_as_single_characters() {
        assert_eq!(wrap("🐱✨🐱✨", 2), vec!["🐱✨", "🐱✨"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn no_line_exceeds_width() {
        let text = "Hi! I'm Pixie! I can follow you around the screen while you drag me.";
        for width in 1..30 {
            for line in wrap(text, width) {
                assert!(line.chars().count() <= width, "{line:?} wider than {width}");
            }
        }
    }
}
