use chrono::NaiveDate;

/// Format a float as a Turkish lira amount with thousands separators: 1.234,56 TL
pub fn money(val: f64) -> String {
    let negative = val < 0.0 && format!("{:.2}", val.abs()) != "0.00";
    let abs = val.abs();
    let kurus = format!("{:.2}", abs);
    let (int_part, dec_part) = kurus.split_once('.').unwrap_or((kurus.as_str(), "00"));

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-{with_dots},{dec_part} TL")
    } else {
        format!("{with_dots},{dec_part} TL")
    }
}

/// `dd.mm.yyyy`, or a dash for an unparsed date.
pub fn date(d: Option<NaiveDate>) -> String {
    d.map_or_else(|| "-".to_string(), |d| d.format("%d.%m.%Y").to_string())
}
