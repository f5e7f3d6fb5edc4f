use chrono::NaiveTime;

use crate::power::PowerReading;

/// Formats a time of day as a 12-hour clock with an AM/PM suffix and no
/// seconds field (e.g. `02:05 PM`).
pub fn clock_text(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

/// Builds the full overlay line from the clock and the latest power read.
///
/// Shapes:
/// * no reading      — `"<time> | Battery: n/a"`
/// * charging        — `"<time> | Battery: <P>% (Charging)"`
/// * on battery      — `"<time> | Battery: <P>% (<H> hrs <M> mins left)"`
/// * no OS estimate  — `"<time> | Battery: <P>%"`
pub fn status_line(time: NaiveTime, power: Option<&PowerReading>) -> String {
    let clock = clock_text(time);
    match power {
        Some(reading) => format!("{clock} | Battery: {}", battery_text(reading)),
        None => format!("{clock} | Battery: n/a"),
    }
}

fn battery_text(reading: &PowerReading) -> String {
    if reading.charging {
        return format!("{}% (Charging)", reading.percent);
    }
    match reading.remaining_secs {
        Some(secs) => {
            let hours = secs / 3600;
            let mins = (secs % 3600) / 60;
            format!("{}% ({} hrs {} mins left)", reading.percent, hours, mins)
        }
        None => format!("{}%", reading.percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    fn discharging(percent: u8, remaining_secs: u64) -> PowerReading {
        PowerReading {
            percent,
            charging: false,
            remaining_secs: Some(remaining_secs),
        }
    }

    #[test]
    fn charging_always_ends_with_charging_suffix() {
        for percent in 0..=100u8 {
            let reading = PowerReading {
                percent,
                charging: true,
                remaining_secs: Some(5400),
            };
            let line = status_line(hm(9, 30), Some(&reading));
            assert!(line.ends_with("(Charging)"), "got {line}");
            assert!(!line.contains("mins"), "got {line}");
        }
    }

    #[test]
    fn remaining_time_breaks_down_into_hours_and_minutes() {
        let cases = [
            (0u64, "0 hrs 0 mins"),
            (59, "0 hrs 0 mins"),
            (60, "0 hrs 1 mins"),
            (3599, "0 hrs 59 mins"),
            (3600, "1 hrs 0 mins"),
            (5400, "1 hrs 30 mins"),
            (86399, "23 hrs 59 mins"),
        ];
        for (secs, expected) in cases {
            let line = status_line(hm(9, 30), Some(&discharging(50, secs)));
            assert!(line.contains(expected), "secs={secs} got {line}");
            assert!(line.ends_with("left)"), "got {line}");
        }
    }

    #[test]
    fn example_afternoon_discharge() {
        let line = status_line(hm(14, 5), Some(&discharging(42, 5400)));
        assert_eq!(line, "02:05 PM | Battery: 42% (1 hrs 30 mins left)");
    }

    #[test]
    fn example_charging() {
        let reading = PowerReading {
            percent: 87,
            charging: true,
            remaining_secs: None,
        };
        let line = status_line(hm(9, 30), Some(&reading));
        assert_eq!(line, "09:30 AM | Battery: 87% (Charging)");
    }

    #[test]
    fn clock_is_twelve_hour_for_every_minute_of_day() {
        for minute_of_day in 0..1440u32 {
            let text = clock_text(hm(minute_of_day / 60, minute_of_day % 60));
            assert_eq!(text.len(), 8, "got {text}");
            assert!(text.ends_with("AM") || text.ends_with("PM"), "got {text}");
            assert_eq!(text.matches(':').count(), 1, "got {text}");
            let hour: u32 = text[..2].parse().unwrap();
            assert!((1..=12).contains(&hour), "got {text}");
        }
    }

    #[test]
    fn midnight_and_noon_render_as_twelve() {
        assert_eq!(clock_text(hm(0, 5)), "12:05 AM");
        assert_eq!(clock_text(hm(12, 0)), "12:00 PM");
    }

    #[test]
    fn missing_reading_renders_fallback() {
        assert_eq!(status_line(hm(9, 30), None), "09:30 AM | Battery: n/a");
    }

    #[test]
    fn missing_estimate_renders_percent_only() {
        let reading = PowerReading {
            percent: 42,
            charging: false,
            remaining_secs: None,
        };
        assert_eq!(
            status_line(hm(9, 30), Some(&reading)),
            "09:30 AM | Battery: 42%"
        );
    }
}
