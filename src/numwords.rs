//! English number words, both directions.
//!
//! `to_words` feeds the table of contents ("chapter seven") and the title
//! page; `parse_words` lets extraction accept spelled-out numbers the OCR
//! layer reports ("twenty-three").

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

pub fn to_words(value: u64) -> String {
    if value < 20 {
        return ONES[value as usize].to_string();
    }
    if value < 100 {
        let tens = TENS[(value / 10) as usize];
        let rest = value % 10;
        return if rest == 0 {
            tens.to_string()
        } else {
            format!("{}-{}", tens, ONES[rest as usize])
        };
    }
    if value < 1000 {
        return join_scale(value, 100, "hundred");
    }
    if value < 1_000_000 {
        return join_scale(value, 1000, "thousand");
    }
    if value < 1_000_000_000 {
        return join_scale(value, 1_000_000, "million");
    }
    join_scale(value, 1_000_000_000, "billion")
}

fn join_scale(value: u64, scale: u64, name: &str) -> String {
    let head = format!("{} {}", to_words(value / scale), name);
    let rest = value % scale;
    if rest == 0 {
        head
    } else {
        format!("{} {}", head, to_words(rest))
    }
}

/// Parse spelled-out English numbers ("twenty-three", "one hundred five").
///
/// Every token must be a number word; anything else rejects the whole
/// phrase, so OCR noise like "point" or "a" never sneaks through as a value.
pub fn parse_words(text: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut seen_token = false;

    for token in text
        .to_ascii_lowercase()
        .split(|c: char| c == ' ' || c == '-')
        .filter(|t| !t.is_empty() && *t != "and")
    {
        seen_token = true;
        if let Some(small) = small_word(token) {
            current = current.checked_add(small)?;
        } else {
            match token {
                "hundred" => {
                    if current == 0 {
                        return None;
                    }
                    current = current.checked_mul(100)?;
                }
                "thousand" => {
                    if current == 0 {
                        return None;
                    }
                    total = total.checked_add(current.checked_mul(1000)?)?;
                    current = 0;
                }
                "million" => {
                    if current == 0 {
                        return None;
                    }
                    total = total.checked_add(current.checked_mul(1_000_000)?)?;
                    current = 0;
                }
                _ => return None,
            }
        }
    }

    if !seen_token {
        return None;
    }
    total.checked_add(current)
}

fn small_word(token: &str) -> Option<u64> {
    if let Some(idx) = ONES.iter().position(|w| *w == token) {
        return Some(idx as u64);
    }
    TENS.iter()
        .position(|w| !w.is_empty() && *w == token)
        .map(|idx| idx as u64 * 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values() {
        assert_eq!(to_words(0), "zero");
        assert_eq!(to_words(7), "seven");
        assert_eq!(to_words(13), "thirteen");
        assert_eq!(to_words(20), "twenty");
        assert_eq!(to_words(23), "twenty-three");
        assert_eq!(to_words(90), "ninety");
    }

    #[test]
    fn hundreds_and_thousands() {
        assert_eq!(to_words(100), "one hundred");
        assert_eq!(to_words(105), "one hundred five");
        assert_eq!(to_words(342), "three hundred forty-two");
        assert_eq!(to_words(1000), "one thousand");
        assert_eq!(to_words(50_000), "fifty thousand");
        assert_eq!(to_words(12_345), "twelve thousand three hundred forty-five");
    }

    #[test]
    fn parses_simple_words() {
        assert_eq!(parse_words("zero"), Some(0));
        assert_eq!(parse_words("seven"), Some(7));
        assert_eq!(parse_words("twenty-three"), Some(23));
        assert_eq!(parse_words("Forty Two"), Some(42));
    }

    #[test]
    fn parses_compound_words() {
        assert_eq!(parse_words("one hundred five"), Some(105));
        assert_eq!(parse_words("three hundred and forty-two"), Some(342));
        assert_eq!(parse_words("fifty thousand"), Some(50_000));
        assert_eq!(
            parse_words("twelve thousand three hundred forty-five"),
            Some(12_345)
        );
    }

    #[test]
    fn rejects_non_number_words() {
        assert_eq!(parse_words("point"), None);
        assert_eq!(parse_words("seven dwarfs"), None);
        assert_eq!(parse_words(""), None);
        assert_eq!(parse_words("hundred"), None);
    }

    #[test]
    fn round_trips_through_words() {
        for value in [0, 9, 19, 40, 77, 100, 911, 1000, 20_023, 50_000] {
            assert_eq!(parse_words(&to_words(value)), Some(value), "{value}");
        }
    }
}
