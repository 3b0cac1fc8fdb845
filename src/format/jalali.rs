//! Solar Hijri (Jalali) calendar rendering for the summary header.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};

const MONTHS: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JalaliDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Convert a proleptic Gregorian date. `month` and `day` are 1-based.
pub fn from_gregorian(gy: i32, gm: u32, gd: u32) -> JalaliDate {
    const DAYS_BEFORE_MONTH: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

    let gy = i64::from(gy);
    let gy2 = if gm > 2 { gy + 1 } else { gy };
    let mut days = 355_666 + 365 * gy + (gy2 + 3) / 4 - (gy2 + 99) / 100 + (gy2 + 399) / 400
        + i64::from(gd)
        + DAYS_BEFORE_MONTH[(gm - 1) as usize];

    let mut jy = -1595 + 33 * (days / 12_053);
    days %= 12_053;
    jy += 4 * (days / 1461);
    days %= 1461;
    if days > 365 {
        jy += (days - 1) / 365;
        days = (days - 1) % 365;
    }
    let (jm, jd) = if days < 186 {
        (1 + days / 31, 1 + days % 31)
    } else {
        (7 + (days - 186) / 30, 1 + (days - 186) % 30)
    };

    JalaliDate {
        year: jy as i32,
        month: jm as u32,
        day: jd as u32,
    }
}

pub fn month_name(month: u32) -> &'static str {
    MONTHS[((month.clamp(1, 12)) - 1) as usize]
}

pub fn weekday_name(wd: Weekday) -> &'static str {
    match wd {
        Weekday::Sat => "شنبه",
        Weekday::Sun => "یکشنبه",
        Weekday::Mon => "دوشنبه",
        Weekday::Tue => "سه‌شنبه",
        Weekday::Wed => "چهارشنبه",
        Weekday::Thu => "پنجشنبه",
        Weekday::Fri => "جمعه",
    }
}

/// `<weekday>، DD <month> YYYY HH:MM:SS` in the timestamp's own offset.
pub fn format_datetime(ts: &DateTime<FixedOffset>) -> String {
    let j = from_gregorian(ts.year(), ts.month(), ts.day());
    format!(
        "{}، {:02} {} {} {:02}:{:02}:{:02}",
        weekday_name(ts.weekday()),
        j.day,
        month_name(j.month),
        j.year,
        ts.hour(),
        ts.minute(),
        ts.second()
    )
}
