//! Time formatting utilities

/// Format seconds as an engine argument
///
/// Rounded to the millisecond with trailing zeros dropped, so `10.0` becomes
/// `"10"` and `15.2000000001` becomes `"15.2"`.
pub fn format_arg_seconds(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as i64;
    let whole = millis / 1000;
    let frac = (millis % 1000).abs();
    if frac == 0 {
        return whole.to_string();
    }
    let sign = if millis < 0 && whole == 0 { "-" } else { "" };
    let digits = format!("{:03}", frac);
    format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}

/// Format seconds as `m:ss` for marker and duration readouts
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_arg_seconds_whole() {
        assert_eq!(format_arg_seconds(10.0), "10");
        assert_eq!(format_arg_seconds(0.0), "0");
    }

    #[test]
    fn test_format_arg_seconds_fraction() {
        assert_eq!(format_arg_seconds(15.2), "15.2");
        assert_eq!(format_arg_seconds(25.3 - 10.1), "15.2");
        assert_eq!(format_arg_seconds(0.125), "0.125");
        assert_eq!(format_arg_seconds(119.05), "119.05");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(59.99), "0:59");
        assert_eq!(format_clock(75.9), "1:15");
        assert_eq!(format_clock(3725.0), "62:05");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }
}
