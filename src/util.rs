/// Shortens `text` to at most `max_chars` characters, marking the cut with an
/// ellipsis that counts toward the limit.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let kept = max_chars.saturating_sub(1);
    let mut shortened = text.chars().take(kept).collect::<String>();
    shortened.push('…');
    shortened
}

pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
