use crate::model::{NormalizedTime, SENTINEL_MINUTES, SourceFormatHint};
use chrono::NaiveTime;
use log::trace;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static DOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{2}) ?(am|pm)?$").unwrap());
static COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::\d{2})? ?(am|pm)?$").unwrap());
static BARE_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}) ?(am|pm)$").unwrap());
// "am"/"pm" standing alone or glued to a digit; "amble" is not a meridian.
static MERIDIAN_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\d|\s)(am|pm)\b").unwrap());
static GLUED_MERIDIAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)(am|pm)\b").unwrap());
static EMBEDDED_MERIDIAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.:])(\d{1,2})(?:[.:](\d{2}))? ?(am|pm)\b").unwrap()
});
// The hour never starts right after a digit or separator: "2.5pm" has no clock time.
static EMBEDDED_PLAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\d.:])(\d{1,2})[.:](\d{2})(?:\D|$)").unwrap());

/// Normalizer bound to one feed's format hint.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeNormalizer {
    pub hint: Option<SourceFormatHint>,
}

impl TimeNormalizer {
    pub fn new(hint: Option<SourceFormatHint>) -> Self {
        Self { hint }
    }

    pub fn normalize(&self, raw: Option<&str>) -> NormalizedTime {
        normalize(raw, self.hint)
    }

    pub fn normalize_value(&self, raw: Option<&Value>) -> NormalizedTime {
        match raw {
            Some(v) => normalize_value(v, self.hint),
            None => NormalizedTime::sentinel(),
        }
    }
}

/// Parse a race-time string from any feed into a display string and a sort key.
///
/// Shapes are tried in order, first match wins:
/// continental `13h30` (hint only), `2.38pm`, `14:05`, `2pm`, then any string
/// with a meridian token, then anything else. Never fails; input that cannot be
/// placed on the clock yields [`NormalizedTime::sentinel`].
pub fn normalize(raw: Option<&str>, hint: Option<SourceFormatHint>) -> NormalizedTime {
    let Some(raw) = raw else {
        return NormalizedTime::sentinel();
    };
    let s = clean(raw);
    if s.is_empty() {
        return NormalizedTime::sentinel();
    }

    if hint == Some(SourceFormatHint::Continental) && s.contains('h') {
        return parse_continental(&s).unwrap_or_else(|| fail(raw, "continental"));
    }

    for (re, shape) in [(&*DOT_RE, "dot"), (&*COLON_RE, "colon")] {
        if let Some(caps) = re.captures(&s) {
            return clock(&caps[1], caps.get(2).map(|m| m.as_str()), meridian(&caps, 3))
                .unwrap_or_else(|| fail(raw, shape));
        }
    }
    if let Some(caps) = BARE_HOUR_RE.captures(&s) {
        return clock(&caps[1], None, meridian(&caps, 2))
            .unwrap_or_else(|| fail(raw, "bare hour"));
    }

    if MERIDIAN_TOKEN_RE.is_match(&s) {
        return meridian_passthrough(&s);
    }
    embedded_plain(&s).unwrap_or_else(|| fail(raw, "unrecognized"))
}

/// Non-string JSON values (numbers, null, objects) never name a race time.
pub fn normalize_value(raw: &Value, hint: Option<SourceFormatHint>) -> NormalizedTime {
    match raw {
        Value::String(s) => normalize(Some(s.as_str()), hint),
        _ => NormalizedTime::sentinel(),
    }
}

fn clean(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let folded = lower
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .replace("a.m", "am")
        .replace("p.m", "pm");
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fail(raw: &str, shape: &str) -> NormalizedTime {
    trace!("time: unparseable {} time {:?}", shape, raw);
    NormalizedTime::sentinel()
}

fn meridian<'h>(caps: &Captures<'h>, idx: usize) -> Option<&'h str> {
    caps.get(idx).map(|m| m.as_str())
}

fn parse_continental(s: &str) -> Option<NormalizedTime> {
    let (hour, minute) = s.split_once('h')?;
    let (hour, minute) = (hour.trim(), minute.trim());
    if hour.is_empty() || minute.len() > 2 {
        return None;
    }
    clock(hour, Some(minute), None)
}

/// Resolve literal hour/minute digits to a 24-hour clock value.
///
/// With a meridian the hour must be 1..=12; without one it is taken as written
/// and must be 0..=23. An empty minute means `:00`.
fn resolve(hour: &str, minute: Option<&str>, meridian: Option<&str>) -> Option<(u32, u32)> {
    let h: u32 = hour.parse().ok()?;
    let m: u32 = match minute {
        Some(mm) if !mm.is_empty() => mm.parse().ok()?,
        _ => 0,
    };
    if m > 59 {
        return None;
    }
    let h24 = match meridian {
        Some(mer) => {
            if !(1..=12).contains(&h) {
                return None;
            }
            match (mer, h) {
                ("pm", h) if h < 12 => h + 12,
                ("am", 12) => 0,
                (_, h) => h,
            }
        }
        None if h > 23 => return None,
        None => h,
    };
    Some((h24, m))
}

fn clock(hour: &str, minute: Option<&str>, meridian: Option<&str>) -> Option<NormalizedTime> {
    let (h, m) = resolve(hour, minute, meridian)?;
    let t = NaiveTime::from_hms_opt(h, m, 0)?;
    Some(NormalizedTime::new(t.format("%-I:%M %P").to_string(), sort_minutes(h, m)))
}

fn sort_minutes(h: u32, m: u32) -> u16 {
    (h * 60 + m).min(SENTINEL_MINUTES as u32) as u16
}

// A meridian is present but the string is not one of the known shapes, e.g.
// "off 2.38pm". The text is kept for display; the sort key comes from the first
// embedded clock time, or sorts last when there is none.
fn meridian_passthrough(s: &str) -> NormalizedTime {
    let display = GLUED_MERIDIAN_RE.replace_all(s, "${1} ${2}").into_owned();
    let minutes = EMBEDDED_MERIDIAN_RE
        .captures(s)
        .and_then(|caps| {
            resolve(&caps[1], caps.get(2).map(|m| m.as_str()), meridian(&caps, 3))
        })
        .map(|(h, m)| sort_minutes(h, m))
        .unwrap_or(SENTINEL_MINUTES);
    trace!("time: meridian passthrough {:?} -> {}", display, minutes);
    NormalizedTime::new(display, minutes)
}

fn embedded_plain(s: &str) -> Option<NormalizedTime> {
    let caps = EMBEDDED_PLAIN_RE.captures(s)?;
    let (h, m) = resolve(&caps[1], Some(&caps[2]), None)?;
    Some(NormalizedTime::new(s, sort_minutes(h, m)))
}
