//! Rule-based field extraction from free chat text.
//!
//! Every extractor is best-effort: a miss is `None`, never an error. The same
//! functions back both the server assistant and the scheduling dialogue.

use std::cmp::Reverse;
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

/// Bundle of extractors consumed by the composer. Lets tests observe which
/// extractors run for a given message.
pub trait FieldExtractor: Send + Sync {
    fn name(&self, text: &str) -> Option<String>;
    fn phone(&self, text: &str) -> Option<String>;
    fn email(&self, text: &str) -> Option<String>;
    fn date(&self, text: &str, today: NaiveDate) -> Option<NaiveDate>;
    fn time(&self, text: &str) -> Option<String>;
    fn class_type(&self, text: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExtractor;

impl FieldExtractor for RuleExtractor {
    fn name(&self, text: &str) -> Option<String> {
        extract_name(text)
    }

    fn phone(&self, text: &str) -> Option<String> {
        extract_phone(text)
    }

    fn email(&self, text: &str) -> Option<String> {
        extract_email(text)
    }

    fn date(&self, text: &str, today: NaiveDate) -> Option<NaiveDate> {
        extract_date(text, today)
    }

    fn time(&self, text: &str) -> Option<String> {
        extract_time(text)
    }

    fn class_type(&self, text: &str) -> Option<String> {
        extract_class_type(text)
    }
}

// ── Name ──

const NAME_STOP_WORDS: &[&str] = &[
    "e", "quero", "queria", "gostaria", "preciso", "vou", "tenho", "para", "pra", "do", "da",
    "de", "no", "na", "com", "hoje", "amanhã", "amanha", "agendar", "marcar", "aula", "meu",
    "minha", "telefone", "celular", "email", "às", "as", "sou", "e-mail",
];

const MAX_NAME_WORDS: usize = 4;

fn name_patterns() -> &'static [Regex] {
    static NAME_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    NAME_RE.get_or_init(|| {
        [
            r"(?i)\bmeu\s+nome\s+[ée]\s+(\p{L}+(?:[\s'-]+\p{L}+)*)",
            r"(?i)\bme\s+chamo\s+(\p{L}+(?:[\s'-]+\p{L}+)*)",
            r"(?i)\beu\s+sou\s+(?:o\s+|a\s+)?(\p{L}+(?:[\s'-]+\p{L}+)*)",
            r"(?i)\bsou\s+(?:o|a)\s+(\p{L}+(?:[\s'-]+\p{L}+)*)",
            // "para a Maria": only capitalised words, so "para amanhã" never matches.
            r"\b[Pp]ara\s+(?:o\s+|a\s+)?(\p{Lu}\p{L}*(?:\s+\p{Lu}\p{L}*)*)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("name regex must compile"))
        .collect()
    })
}

/// Ordered patterns; the first one yielding a usable capture wins.
pub fn extract_name(text: &str) -> Option<String> {
    name_patterns().iter().find_map(|re| {
        let caps = re.captures(text)?;
        clean_name(caps.get(1)?.as_str())
    })
}

fn clean_name(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .take_while(|w| !NAME_STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .take(MAX_NAME_WORDS)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" ").trim().to_string())
    }
}

/// Accepts a reply that is nothing but a name, e.g. "Carlos Souza".
pub fn extract_bare_name(text: &str) -> Option<String> {
    let trimmed = text.trim().trim_end_matches(&['.', '!'][..]);
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_NAME_WORDS {
        return None;
    }
    let plausible = words.iter().all(|w| {
        w.chars().count() >= 2
            && w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')
            && !NAME_STOP_WORDS.contains(&w.to_lowercase().as_str())
    });
    plausible.then(|| words.join(" "))
}

// ── Phone / e-mail ──

fn labelled_phone_regex() -> &'static Regex {
    static LABELLED_PHONE_RE: OnceLock<Regex> = OnceLock::new();
    LABELLED_PHONE_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:telefone|tel|celular|cel|whats(?:app)?|fone|contato)\s*[:\-]?\s*(\+?[\d\s().\-]{7,20}\d)")
            .expect("labelled phone regex must compile")
    })
}

fn bare_phone_regex() -> &'static Regex {
    static BARE_PHONE_RE: OnceLock<Regex> = OnceLock::new();
    BARE_PHONE_RE.get_or_init(|| {
        Regex::new(r"(?:\+?55\s?)?(?:\(\d{2}\)|\d{2})[\s-]?9?\d{4}[\s-]?\d{4}")
            .expect("bare phone regex must compile")
    })
}

const MIN_PHONE_DIGITS: usize = 8;

pub fn extract_phone(text: &str) -> Option<String> {
    let labelled = labelled_phone_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| digits_only(m.as_str()))
        .filter(|d| d.len() >= MIN_PHONE_DIGITS);

    labelled.or_else(|| {
        bare_phone_regex()
            .find(text)
            .map(|m| digits_only(m.as_str()))
            .filter(|d| d.len() >= MIN_PHONE_DIGITS)
    })
}

pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}").expect("email regex must compile")
    })
}

pub fn extract_email(text: &str) -> Option<String> {
    email_regex().find(text).map(|m| m.as_str().to_lowercase())
}

// ── Dates ──

#[derive(Debug, Clone, Copy, PartialEq)]
enum DayKey {
    Offset(i64),
    Weekday { day: Weekday, skip_week: bool },
}

const WEEKDAY_ALIASES: &[(&str, Weekday)] = &[
    ("segunda", Weekday::Mon),
    ("terça", Weekday::Tue),
    ("terca", Weekday::Tue),
    ("quarta", Weekday::Wed),
    ("quinta", Weekday::Thu),
    ("sexta", Weekday::Fri),
    ("sábado", Weekday::Sat),
    ("sabado", Weekday::Sat),
    ("domingo", Weekday::Sun),
];

const NEXT_PREFIXES: &[&str] = &["próxima ", "proxima ", "próximo ", "proximo "];

/// Date keys, longest first so "próxima segunda" beats "segunda" and
/// "depois de amanhã" beats "amanhã". Ties keep table order.
fn date_keys() -> &'static [(String, DayKey)] {
    static DATE_KEYS: OnceLock<Vec<(String, DayKey)>> = OnceLock::new();
    DATE_KEYS.get_or_init(|| {
        let mut keys: Vec<(String, DayKey)> = vec![
            ("hoje".to_string(), DayKey::Offset(0)),
            ("amanhã".to_string(), DayKey::Offset(1)),
            ("amanha".to_string(), DayKey::Offset(1)),
            ("depois de amanhã".to_string(), DayKey::Offset(2)),
            ("depois de amanha".to_string(), DayKey::Offset(2)),
        ];
        for (alias, day) in WEEKDAY_ALIASES {
            keys.push((alias.to_string(), DayKey::Weekday { day: *day, skip_week: false }));
            for prefix in NEXT_PREFIXES {
                keys.push((
                    format!("{prefix}{alias}"),
                    DayKey::Weekday { day: *day, skip_week: true },
                ));
            }
        }
        keys.sort_by_key(|(k, _)| Reverse(k.chars().count()));
        keys
    })
}

pub fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    let (_, key) = date_keys().iter().find(|(k, _)| lower.contains(k.as_str()))?;
    Some(match *key {
        DayKey::Offset(days) => today + Duration::days(days),
        DayKey::Weekday { day, skip_week } => next_weekday(today, day, skip_week),
    })
}

/// Weekday names only: no "hoje", "amanhã" or "próxima".
pub fn extract_weekday(text: &str) -> Option<Weekday> {
    let lower = text.to_lowercase();
    WEEKDAY_ALIASES
        .iter()
        .find(|(alias, _)| lower.contains(alias))
        .map(|(_, day)| *day)
}

/// Next occurrence of `target` strictly after `today`; a week later when `skip_week`.
pub fn next_weekday(today: NaiveDate, target: Weekday, skip_week: bool) -> NaiveDate {
    let mut offset = target.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64;
    if offset <= 0 {
        offset += 7;
    }
    if skip_week {
        offset += 7;
    }
    today + Duration::days(offset)
}

const WEEKDAY_LABELS: [&str; 7] = [
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
    "Domingo",
];

pub fn weekday_label(day: Weekday) -> &'static str {
    WEEKDAY_LABELS[day.num_days_from_monday() as usize]
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_from_label(label: &str) -> Option<Weekday> {
    let idx = WEEKDAY_LABELS.iter().position(|l| l.eq_ignore_ascii_case(label.trim()))?;
    Some(WEEKDAYS[idx])
}

// ── Times ──

#[derive(Debug, Clone, Copy, PartialEq)]
enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
    Early,
}

impl DayPeriod {
    fn default_hour(&self) -> u32 {
        match self {
            DayPeriod::Morning => 9,
            DayPeriod::Afternoon => 14,
            DayPeriod::Evening => 19,
            DayPeriod::Early => 6,
        }
    }

    fn adjust(&self, hour: u32) -> u32 {
        match self {
            DayPeriod::Afternoon | DayPeriod::Evening if hour < 12 => hour + 12,
            DayPeriod::Morning if hour > 12 => hour - 12,
            _ => hour,
        }
    }
}

fn explicit_time_patterns() -> &'static [Regex] {
    static TIME_RE: OnceLock<Vec<Regex>> = OnceLock::new();
    TIME_RE.get_or_init(|| {
        [
            r"\b(\d{1,2}):(\d{2})\b",
            r"\b(\d{1,2})h(\d{2})(?:min)?\b",
            r"(?i)\b(\d{1,2})\s*(?:h|hs|hrs|horas?)\b",
            r"(?i)\b(?:às|as|a partir das)\s+(\d{1,2})\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("time regex must compile"))
        .collect()
    })
}

fn period_patterns() -> &'static [(Regex, DayPeriod)] {
    static PERIOD_RE: OnceLock<Vec<(Regex, DayPeriod)>> = OnceLock::new();
    PERIOD_RE.get_or_init(|| {
        // Word boundaries keep "amanhã" from reading as "manhã".
        [
            (r"(?i)\bmanh[ãa]\b", DayPeriod::Morning),
            (r"(?i)\btarde\b", DayPeriod::Afternoon),
            (r"(?i)\bnoite\b", DayPeriod::Evening),
            (r"(?i)\bcedo\b", DayPeriod::Early),
        ]
        .into_iter()
        .map(|(p, period)| (Regex::new(p).expect("period regex must compile"), period))
        .collect()
    })
}

fn greeting_pattern() -> &'static Regex {
    static GREETING_RE: OnceLock<Regex> = OnceLock::new();
    GREETING_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:bom\s+dia|boa\s+tarde|boa\s+noite)\b")
            .expect("greeting regex must compile")
    })
}

/// Greetings such as "boa tarde" say nothing about the wanted time.
fn detect_period(text: &str) -> Option<DayPeriod> {
    let text = greeting_pattern().replace_all(text, " ");
    period_patterns()
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, period)| *period)
}

/// Returns a 24h `HH:MM` string. Explicit clock times win over period words.
pub fn extract_time(text: &str) -> Option<String> {
    let period = detect_period(text);

    let explicit = explicit_time_patterns().iter().find_map(|re| {
        let caps = re.captures(text)?;
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        (hour <= 23 && minute <= 59).then_some((hour, minute))
    });

    let (hour, minute) = match (explicit, period) {
        (Some((h, m)), Some(p)) => (p.adjust(h), m),
        (Some((h, m)), None) => (h, m),
        (None, Some(p)) => (p.default_hour(), 0),
        (None, None) => return None,
    };

    Some(format!("{hour:02}:{minute:02}"))
}

// ── Class type ──

const CLASS_VOCABULARY: &[(&[&str], &str)] = &[
    (&["musculação", "musculacao"], "Musculação"),
    (&["crossfit", "cross fit"], "Crossfit"),
    (&["pilates"], "Pilates"),
    (&["yoga", "ioga"], "Yoga"),
    (&["funcional"], "Funcional"),
    (&["spinning", "bike indoor"], "Spinning"),
    (&["zumba"], "Zumba"),
    (&["natação", "natacao"], "Natação"),
    (&["muay thai"], "Muay Thai"),
    (&["boxe", "boxing"], "Boxe"),
    (&["dança", "danca"], "Dança"),
];

pub const DEFAULT_CLASS_TYPE: &str = "Musculação";

pub fn extract_class_type(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    CLASS_VOCABULARY
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, label)| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-06-16 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_name_patterns() {
        assert_eq!(extract_name("Oi, meu nome é Carlos").as_deref(), Some("Carlos"));
        assert_eq!(extract_name("me chamo Ana Paula").as_deref(), Some("Ana Paula"));
        assert_eq!(extract_name("eu sou o João").as_deref(), Some("João"));
        assert_eq!(extract_name("agendar para a Maria").as_deref(), Some("Maria"));
    }

    #[test]
    fn test_name_stops_at_connector() {
        assert_eq!(
            extract_name("meu nome é Carlos e quero agendar").as_deref(),
            Some("Carlos")
        );
    }

    #[test]
    fn test_name_specific_pattern_wins() {
        // "meu nome é" precedes the looser "para X" pattern
        assert_eq!(
            extract_name("agendar para Pedro, meu nome é Carlos").as_deref(),
            Some("Carlos")
        );
    }

    #[test]
    fn test_name_ignores_lowercase_para() {
        assert_eq!(extract_name("quero agendar para amanhã"), None);
        assert_eq!(extract_name("quero treinar"), None);
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(extract_bare_name("Carlos Souza").as_deref(), Some("Carlos Souza"));
        assert_eq!(extract_bare_name("amanhã"), None);
        assert_eq!(extract_bare_name("11999998888"), None);
        assert_eq!(extract_bare_name("um dois três quatro cinco"), None);
    }

    #[test]
    fn test_phone_labelled_preferred() {
        let text = "ligue 11 3333-4444 ou telefone: (11) 99999-8888";
        assert_eq!(extract_phone(text).as_deref(), Some("11999998888"));
    }

    #[test]
    fn test_phone_bare() {
        assert_eq!(extract_phone("meu número é 11999998888").as_deref(), Some("11999998888"));
        assert_eq!(extract_phone("(21) 3333-4444").as_deref(), Some("2133334444"));
        assert_eq!(extract_phone("às 14h"), None);
    }

    #[test]
    fn test_email_lowercased() {
        assert_eq!(
            extract_email("meu email é Carlos.Silva@Example.COM ok").as_deref(),
            Some("carlos.silva@example.com")
        );
        assert_eq!(extract_email("sem email"), None);
    }

    #[test]
    fn test_relative_dates() {
        assert_eq!(extract_date("hoje", monday()), Some(monday()));
        assert_eq!(extract_date("Amanhã cedo", monday()), Some(date("2025-06-17")));
        assert_eq!(extract_date("amanha", monday()), Some(date("2025-06-17")));
        assert_eq!(extract_date("depois de amanhã", monday()), Some(date("2025-06-18")));
    }

    #[test]
    fn test_named_weekday_never_today() {
        // today is Monday: "segunda" means next week's Monday
        assert_eq!(extract_date("segunda", monday()), Some(date("2025-06-23")));
        assert_eq!(extract_date("quarta-feira", monday()), Some(date("2025-06-18")));
        assert_eq!(extract_date("domingo", monday()), Some(date("2025-06-22")));
    }

    #[test]
    fn test_weekday_strictly_future_for_every_day() {
        let mut today = monday();
        for _ in 0..7 {
            for (alias, _) in WEEKDAY_ALIASES {
                let resolved = extract_date(alias, today).unwrap();
                assert!(resolved > today, "{alias} from {today}");
                assert!(resolved <= today + Duration::days(7));
            }
            today += Duration::days(1);
        }
    }

    #[test]
    fn test_next_weekday_adds_a_week() {
        let mut today = monday();
        for _ in 0..7 {
            for (alias, _) in WEEKDAY_ALIASES {
                let plain = extract_date(alias, today).unwrap();
                let next = extract_date(&format!("próxima {alias}"), today).unwrap();
                assert_eq!(next, plain + Duration::days(7));
            }
            today += Duration::days(1);
        }
    }

    #[test]
    fn test_no_date() {
        assert_eq!(extract_date("quero treinar", monday()), None);
    }

    #[test]
    fn test_weekday_only_extractor() {
        assert_eq!(extract_weekday("Sábado de manhã"), Some(Weekday::Sat));
        assert_eq!(extract_weekday("amanhã"), None);
    }

    #[test]
    fn test_weekday_labels_round_trip() {
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Sat, Weekday::Sun] {
            assert_eq!(weekday_from_label(weekday_label(day)), Some(day));
        }
        assert_eq!(weekday_from_label("feriado"), None);
    }

    #[test]
    fn test_explicit_times() {
        assert_eq!(extract_time("às 14:30").as_deref(), Some("14:30"));
        assert_eq!(extract_time("18h15").as_deref(), Some("18:15"));
        assert_eq!(extract_time("amanhã às 14h").as_deref(), Some("14:00"));
        assert_eq!(extract_time("7 horas").as_deref(), Some("07:00"));
        assert_eq!(extract_time("as 8").as_deref(), Some("08:00"));
    }

    #[test]
    fn test_period_adjusts_explicit_hour() {
        assert_eq!(extract_time("às 7h da noite").as_deref(), Some("19:00"));
        assert_eq!(extract_time("3h da tarde").as_deref(), Some("15:00"));
        assert_eq!(extract_time("às 20h da manhã").as_deref(), Some("08:00"));
        assert_eq!(extract_time("às 8h da manhã").as_deref(), Some("08:00"));
    }

    #[test]
    fn test_period_defaults() {
        assert_eq!(extract_time("de manhã").as_deref(), Some("09:00"));
        assert_eq!(extract_time("à tarde").as_deref(), Some("14:00"));
        assert_eq!(extract_time("à noite").as_deref(), Some("19:00"));
        assert_eq!(extract_time("bem cedo").as_deref(), Some("06:00"));
    }

    #[test]
    fn test_amanha_is_not_morning() {
        assert_eq!(extract_time("amanhã"), None);
    }

    #[test]
    fn test_greetings_are_not_periods() {
        assert_eq!(
            extract_time("Boa tarde, quero agendar amanhã às 8h").as_deref(),
            Some("08:00")
        );
        assert_eq!(extract_time("Boa noite, quero agendar amanhã"), None);
        assert_eq!(extract_time("bom dia! pode ser de manhã?").as_deref(), Some("09:00"));
        assert_eq!(
            extract_time("boa noite, às 7h da noite").as_deref(),
            Some("19:00")
        );
    }

    #[test]
    fn test_minutes_suffix() {
        assert_eq!(extract_time("amanhã às 14h30min").as_deref(), Some("14:30"));
        assert_eq!(extract_time("18h05min").as_deref(), Some("18:05"));
    }

    #[test]
    fn test_out_of_range_time_ignored() {
        assert_eq!(extract_time("às 27:00"), None);
    }

    #[test]
    fn test_class_type() {
        assert_eq!(extract_class_type("quero fazer PILATES").as_deref(), Some("Pilates"));
        assert_eq!(extract_class_type("musculacao").as_deref(), Some("Musculação"));
        assert_eq!(extract_class_type("aula experimental"), None);
    }
}
