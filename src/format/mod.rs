//! # Message formatting
//! Turns a batch of links into one summary message and N page messages.
//! Pure apart from the injected randomness used for decorative markers.

pub mod jalali;

use chrono::{DateTime, FixedOffset, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::ingest::clean_link;
use crate::ingest::types::ProxyLink;
use crate::notify::{DispatchMessage, MessageKind, ParseMode};

/// Characters left unescaped in link payloads so clients can still parse the proxy URI.
const LINK_SAFE: &str = ":/?&=";

/// Decorative markers, one picked uniformly per entry.
pub const MARKERS: [&str; 7] = ["🌁", "🌃", "🏙️", "🌄", "🌅", "🌇", "🏞️"];

const TERMS_URL: &str = "https://telegra.ph/Terms-and-Conditions-07-08-3";
const FAQ_URL: &str = "https://telegra.ph/FAQ---Frequently-Asked-Question-07-09";

const NOTICE_FA: &str = "⚠️ بسته به ویژگی‌ها و کیفیت اتصال اینترنت و نسخه کلاینت تلگرام شما، برخی سرورهای پروکسی ممکن است عملکرد مطلوبی نداشته باشند. بنابراین، پیشنهاد می‌شود پروکسی‌های جایگزین را آزمایش کرده و از گزینه‌هایی استفاده کنید که سازگاری و کارایی بهتری ارائه می‌دهند. ⚠️";
const NOTICE_EN: &str = "⚠️ Depending on the characteristics and quality of your internet connection and the version of your Telegram client, some proxy servers may not perform optimally. Therefore, it is recommended to test alternative proxies and use those that offer better compatibility and efficiency. ⚠️";

const PAGE_RULE: &str = "---------------";

/// Tehran time (UTC+03:30) used for every rendered timestamp.
pub fn target_offset() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600 + 30 * 60).expect("+03:30 is a valid offset")
}

/// Percent-encode a link for use inside message link syntax, keeping `:/?&=` literal.
pub fn escape_link(link: &str) -> String {
    let mut out = String::with_capacity(link.len());
    let mut buf = [0u8; 4];
    for ch in link.chars() {
        if LINK_SAFE.contains(ch) {
            out.push(ch);
        } else {
            out.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Escape the legacy Markdown control characters in free text.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub page_size: usize,
    pub summary_mode: ParseMode,
    pub channel_tag: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            summary_mode: ParseMode::Html,
            channel_tag: "@proxyroohejangali".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    /// Unique links after dedup.
    pub collected: usize,
    /// Links actually published after sampling.
    pub published: usize,
}

pub struct Formatter {
    opts: FormatOptions,
}

impl Formatter {
    pub fn new(opts: FormatOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.opts
    }

    pub fn summary(&self, stats: SummaryStats, now: DateTime<Utc>) -> DispatchMessage {
        let local = now.with_timezone(&target_offset());
        let jalali = jalali::format_datetime(&local);
        let gregorian = local.format("%a, %d %b %Y %H:%M:%S").to_string();
        let m = Markup(self.opts.summary_mode);
        let sampled = stats.published != stats.collected;

        let mut text = String::new();
        text += &format!("{} {}\n\n", m.bold("🔄 آخرین بروزرسانی پروکسی‌ها:"), m.text(&jalali));
        text += &format!(
            "{} {}\n\n",
            m.bold("📄 تعداد کل پروکسی‌های جمع آوری شده:"),
            stats.collected
        );
        if sampled {
            text += &format!(
                "{} {}\n\n",
                m.bold("📤 تعداد پروکسی‌های منتشر شده:"),
                stats.published
            );
        }
        text += &format!("{}\n\n", m.quote(NOTICE_FA));
        text += &format!(
            "{} | {}\n\n",
            m.link("شرایط و قوانین", TERMS_URL),
            m.link("سوالات متداول", FAQ_URL)
        );
        text += &format!("{} {}\n\n", m.bold("🔄 Latest Proxies Update:"), m.text(&gregorian));
        text += &format!("{} {}\n\n", m.bold("📄 Total Proxies Collected:"), stats.collected);
        if sampled {
            text += &format!("{} {}\n\n", m.bold("📤 Proxies Published:"), stats.published);
        }
        text += &format!("{}\n\n", m.quote(NOTICE_EN));
        text += &format!(
            "{} | {}\n\n",
            m.link("Terms and Conditions", TERMS_URL),
            m.link("FAQ - Frequently Asked Questions", FAQ_URL)
        );
        text += &m.text(&self.opts.channel_tag);

        DispatchMessage {
            kind: MessageKind::Summary,
            text,
            parse_mode: self.opts.summary_mode,
            disable_preview: true,
        }
    }

    /// Chunk `links` into pages; entries are numbered 1..=len across all pages.
    pub fn pages<R: Rng + ?Sized>(&self, links: &[ProxyLink], rng: &mut R) -> Vec<DispatchMessage> {
        let size = self.opts.page_size.max(1);
        let total = links.len().div_ceil(size);
        let tag = escape_markdown(&self.opts.channel_tag);

        links
            .chunks(size)
            .enumerate()
            .map(|(page_idx, chunk)| {
                let start = page_idx * size;
                let mut text = format!("*Proxy Links (Page {}):*\n", page_idx + 1);
                for (offset, link) in chunk.iter().enumerate() {
                    let marker = MARKERS.choose(&mut *rng).copied().unwrap_or_default();
                    text += &format!(
                        "{PAGE_RULE}\n[Proxy {}  {}]({})\n{PAGE_RULE}\n",
                        start + offset + 1,
                        marker,
                        escape_link(&clean_link(link.as_str()))
                    );
                }
                text += &format!("\n{tag}");

                DispatchMessage {
                    kind: MessageKind::Page {
                        number: page_idx + 1,
                        total,
                    },
                    text,
                    parse_mode: ParseMode::Markdown,
                    disable_preview: true,
                }
            })
            .collect()
    }
}

/// Per-mode rendering of the few constructs the summary uses.
struct Markup(ParseMode);

impl Markup {
    fn text(&self, s: &str) -> String {
        match self.0 {
            ParseMode::Plain => s.to_string(),
            ParseMode::Markdown => escape_markdown(s),
            ParseMode::Html => html_escape::encode_text(s).into_owned(),
        }
    }

    fn bold(&self, s: &str) -> String {
        match self.0 {
            ParseMode::Plain => s.to_string(),
            ParseMode::Markdown => format!("*{}*", escape_markdown(s)),
            ParseMode::Html => format!("<b>{}</b>", html_escape::encode_text(s)),
        }
    }

    fn quote(&self, s: &str) -> String {
        match self.0 {
            ParseMode::Html => format!("<blockquote>{}</blockquote>", html_escape::encode_text(s)),
            _ => self.text(s),
        }
    }

    fn link(&self, label: &str, url: &str) -> String {
        match self.0 {
            ParseMode::Plain => format!("{label}: {url}"),
            ParseMode::Markdown => format!("[{}]({url})", escape_markdown(label)),
            ParseMode::Html => format!(
                "<a href='{}'>{}</a>",
                html_escape::encode_single_quoted_attribute(url),
                html_escape::encode_text(label)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn links(n: usize) -> Vec<ProxyLink> {
        (0..n)
            .map(|i| ProxyLink::new(format!("tg://proxy?server=h{i}&port=443&secret=s")))
            .collect()
    }

    #[test]
    fn escape_keeps_uri_structure() {
        assert_eq!(
            escape_link("tg://proxy?server=a.b&port=1&secret=ee+/x y"),
            "tg://proxy?server=a.b&port=1&secret=ee%2B/x%20y"
        );
        assert_eq!(escape_link("@x()"), "%40x%28%29");
    }

    #[test]
    fn twenty_three_links_make_three_pages() {
        let f = Formatter::new(FormatOptions::default());
        let mut rng = StdRng::seed_from_u64(3);
        let pages = f.pages(&links(23), &mut rng);
        assert_eq!(pages.len(), 3);

        let counts: Vec<usize> = pages.iter().map(|p| p.text.matches("[Proxy ").count()).collect();
        assert_eq!(counts, vec![10, 10, 3]);

        let mut seen = Vec::new();
        for p in &pages {
            for line in p.text.lines().filter(|l| l.starts_with("[Proxy ")) {
                let n: usize = line["[Proxy ".len()..]
                    .split_whitespace()
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                seen.push(n);
            }
            assert!(p.text.ends_with("\n@proxyroohejangali"));
            assert_eq!(p.parse_mode, ParseMode::Markdown);
        }
        assert_eq!(seen, (1..=23).collect::<Vec<_>>());
        assert_eq!(pages[2].kind, MessageKind::Page { number: 3, total: 3 });
    }

    #[test]
    fn page_links_use_the_cleaned_form() {
        let f = Formatter::new(FormatOptions::default());
        let links = vec![
            ProxyLink::new("tg://proxy?server=B&amp;port=2&amp;secret=T"),
            ProxyLink::new("@tg://proxy?server=C&port=3&secret=U"),
        ];
        let pages = f.pages(&links, &mut StdRng::seed_from_u64(1));
        assert!(pages[0].text.contains("](tg://proxy?server=B&port=2&secret=T)"));
        assert!(pages[0].text.contains("](tg://proxy?server=C&port=3&secret=U)"));
        assert!(!pages[0].text.contains("%40"));
        assert!(!pages[0].text.contains("amp"));
    }

    #[test]
    fn markers_are_deterministic_for_a_seed() {
        let f = Formatter::new(FormatOptions::default());
        let a = f.pages(&links(12), &mut StdRng::seed_from_u64(9));
        let b = f.pages(&links(12), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn html_summary_has_counts_dates_and_tag() {
        let f = Formatter::new(FormatOptions::default());
        let now = Utc.with_ymd_and_hms(2025, 3, 21, 5, 35, 7).unwrap();
        let msg = f.summary(
            SummaryStats {
                collected: 42,
                published: 42,
            },
            now,
        );
        assert_eq!(msg.kind, MessageKind::Summary);
        assert_eq!(msg.parse_mode, ParseMode::Html);
        assert!(msg.disable_preview);
        assert!(msg.text.contains("<b>📄 Total Proxies Collected:</b> 42"));
        // 05:35 UTC is 09:05 in Tehran
        assert!(msg.text.contains("Fri, 21 Mar 2025 09:05:07"));
        assert!(msg.text.contains("01 فروردین 1404 09:05:07"));
        assert!(msg.text.contains(&format!("<a href='{TERMS_URL}'>")));
        assert!(!msg.text.contains("Proxies Published"));
        assert!(msg.text.ends_with("@proxyroohejangali"));
    }

    #[test]
    fn sampled_summary_discloses_published_count() {
        let f = Formatter::new(FormatOptions {
            summary_mode: ParseMode::Markdown,
            ..FormatOptions::default()
        });
        let msg = f.summary(
            SummaryStats {
                collected: 1500,
                published: 1000,
            },
            Utc::now(),
        );
        assert!(msg.text.contains("*📤 Proxies Published:* 1000"));
        assert!(msg.text.contains("*📄 Total Proxies Collected:* 1500"));
        assert!(msg.text.contains(&format!("[Terms and Conditions]({TERMS_URL})")));
    }

    #[test]
    fn empty_batch_has_no_pages() {
        let f = Formatter::new(FormatOptions::default());
        assert!(f.pages(&[], &mut StdRng::seed_from_u64(0)).is_empty());
    }
}
