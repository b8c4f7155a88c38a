// src/grading/labels.rs

//! Option labels.
//!
//! The option at position `i` is answered with the letter `'A' + i`. Answer
//! keys are stored as labels rather than indices, so authoring, taking and
//! grading must all derive labels through these functions.

const ALPHABET_LEN: usize = 26;

/// Returns the label for the option at `index`, or `None` past 'Z'.
pub fn label_for_index(index: usize) -> Option<String> {
    if index >= ALPHABET_LEN {
        return None;
    }
    let ch = (b'A' + index as u8) as char;
    Some(ch.to_string())
}

/// Inverse of [`label_for_index`]. Only a single uppercase ASCII letter maps.
pub fn index_for_label(label: &str) -> Option<usize> {
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii_uppercase() => Some((ch as u8 - b'A') as usize),
        _ => None,
    }
}

/// Labels for every option of a question with `option_count` options.
pub fn option_labels(option_count: usize) -> Vec<String> {
    (0..option_count).filter_map(label_for_index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_options_map_to_leading_letters() {
        assert_eq!(label_for_index(0).as_deref(), Some("A"));
        assert_eq!(label_for_index(4).as_deref(), Some("E"));
        assert_eq!(label_for_index(25).as_deref(), Some("Z"));
        assert_eq!(label_for_index(26), None);
    }

    #[test]
    fn labels_round_trip_through_index() {
        for i in 0..5 {
            let label = label_for_index(i).unwrap();
            assert_eq!(index_for_label(&label), Some(i));
        }
    }

    #[test]
    fn rejects_non_labels() {
        assert_eq!(index_for_label(""), None);
        assert_eq!(index_for_label("a"), None);
        assert_eq!(index_for_label("AB"), None);
        assert_eq!(index_for_label("1"), None);
    }

    #[test]
    fn option_labels_follow_option_order() {
        assert_eq!(option_labels(3), vec!["A", "B", "C"]);
        assert!(option_labels(0).is_empty());
    }
}
