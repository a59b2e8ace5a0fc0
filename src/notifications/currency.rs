/// Formats minor units as rupees with Indian digit grouping, e.g. `₹1,50,000.00`.
pub fn format_inr(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    let rupees = (minor / 100).to_string();
    let paise = minor % 100;

    format!("{sign}₹{}.{paise:02}", group_indian(&rupees))
}

// Last three digits form one group, everything before groups in pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}
