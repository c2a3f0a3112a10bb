//! Output bounding for tool results.
//!
//! Every cap in the engine is expressed in bytes. Text is clipped at the
//! nearest char boundary at or below the cap so clipped output is still valid
//! UTF-8; byte slices are clipped byte-exact.

/// A clipped string plus the metadata the model needs to reason about what
/// it missed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounded {
    pub text: String,
    pub truncated: bool,
    /// Byte length of the original, before clipping.
    pub total_size: usize,
}

pub fn bound_str(s: &str, cap: usize) -> Bounded {
    let total_size = s.len();
    if total_size <= cap {
        return Bounded {
            text: s.to_string(),
            truncated: false,
            total_size,
        };
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    Bounded {
        text: s[..end].to_string(),
        truncated: true,
        total_size,
    }
}

pub fn bound_bytes(bytes: &[u8], cap: usize) -> (Vec<u8>, bool, usize) {
    let total_size = bytes.len();
    if total_size <= cap {
        (bytes.to_vec(), false, total_size)
    } else {
        (bytes[..cap].to_vec(), true, total_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_cap_is_untouched() {
        let out = bound_str("hello", 10);
        assert_eq!(out.text, "hello");
        assert!(!out.truncated);
        assert_eq!(out.total_size, 5);
    }

    #[test]
    fn exactly_at_cap_is_not_truncated() {
        let out = bound_str("hello", 5);
        assert_eq!(out.text, "hello");
        assert!(!out.truncated);
    }

    #[test]
    fn one_byte_under_cap_truncates() {
        let out = bound_str("hello", 4);
        assert_eq!(out.text, "hell");
        assert!(out.truncated);
        assert_eq!(out.total_size, 5);
    }

    #[test]
    fn clip_lands_on_char_boundary() {
        // 'é' is two bytes; a cap in the middle of it must back off.
        let s = "aé";
        let out = bound_str(s, 2);
        assert_eq!(out.text, "a");
        assert!(out.truncated);
        assert_eq!(out.total_size, 3);
    }

    #[test]
    fn multibyte_heavy_input_stays_valid_utf8() {
        let s = "中".repeat(100);
        let out = bound_str(&s, 50);
        assert!(out.truncated);
        assert!(out.text.len() <= 50);
        assert!(out.text.chars().all(|c| c == '中'));
    }

    #[test]
    fn bytes_are_clipped_exact() {
        let (clipped, truncated, total) = bound_bytes(&[1, 2, 3, 4], 2);
        assert_eq!(clipped, vec![1, 2]);
        assert!(truncated);
        assert_eq!(total, 4);
    }
}
