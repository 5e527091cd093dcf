//! Bilingual narrative templates
//!
//! A [`TemplateTable`] is plain immutable data. Components receive it as an
//! `Arc` at construction, so independent pipelines (one per monitored node)
//! never share mutable text state.
//!
//! Templates use named `{placeholder}` slots filled by [`fill`].
//!
//! Custom texts can be layered over the built-in table with
//! [`TemplateTable::overlay`]. A file holds a map from language code to a
//! partial [`LanguagePack`]:
//!
//! ```json
//! { "en": { "stories": { "throughput": { "good": "{value} TPS, all fine." } } } }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::health::HealthLabel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Titles of the list sections of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Achievements,
    Problems,
    Investor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Openings {
    pub healthy: Vec<String>,
    pub warning: Vec<String>,
    pub critical: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Headings {
    pub achievements: String,
    pub problems: String,
    pub investor: String,
}

/// All templates of one language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagePack {
    pub openings: Openings,

    /// channel name -> tier key -> template
    pub stories: HashMap<String, HashMap<String, String>>,

    /// milestone id -> template
    pub achievements: HashMap<String, String>,

    /// problem id -> template
    pub problems: HashMap<String, String>,

    /// digest statistic -> template
    pub investor: HashMap<String, String>,

    pub headings: Headings,
}

impl LanguagePack {
    /// Replace every template that `other` defines. Empty opening pools and
    /// empty headings in `other` leave the current ones alone.
    pub fn overlay(&mut self, other: LanguagePack) {
        let LanguagePack {
            openings,
            stories,
            achievements,
            problems,
            investor,
            headings,
        } = other;

        for (current, replacement) in [
            (&mut self.openings.healthy, openings.healthy),
            (&mut self.openings.warning, openings.warning),
            (&mut self.openings.critical, openings.critical),
        ] {
            if !replacement.is_empty() {
                *current = replacement;
            }
        }

        for (channel, tiers) in stories {
            self.stories.entry(channel).or_default().extend(tiers);
        }
        self.achievements.extend(achievements);
        self.problems.extend(problems);
        self.investor.extend(investor);

        for (current, replacement) in [
            (&mut self.headings.achievements, headings.achievements),
            (&mut self.headings.problems, headings.problems),
            (&mut self.headings.investor, headings.investor),
        ] {
            if !replacement.is_empty() {
                *current = replacement;
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateTable {
    packs: HashMap<Language, LanguagePack>,
}

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pack(mut self, language: Language, pack: LanguagePack) -> Self {
        self.packs.insert(language, pack);
        self
    }

    /// The built-in English and Arabic templates
    pub fn builtin() -> Self {
        Self::new()
            .with_pack(Language::En, english())
            .with_pack(Language::Ar, arabic())
    }

    /// Layer `other` over this table, language by language
    pub fn overlay(mut self, other: TemplateTable) -> Self {
        for (language, pack) in other.packs {
            self.packs.entry(language).or_default().overlay(pack);
        }
        self
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.packs.keys().copied()
    }

    pub fn pack(&self, language: Language) -> Option<&LanguagePack> {
        self.packs.get(&language)
    }

    pub fn openings(&self, language: Language, label: HealthLabel) -> &[String] {
        let Some(pack) = self.pack(language) else {
            return &[];
        };
        match label {
            HealthLabel::Healthy => &pack.openings.healthy,
            HealthLabel::Warning => &pack.openings.warning,
            HealthLabel::Critical => &pack.openings.critical,
        }
    }

    pub fn story(&self, language: Language, channel: &str, key: &str) -> Option<&str> {
        self.pack(language)?
            .stories
            .get(channel)?
            .get(key)
            .map(String::as_str)
    }

    pub fn achievement(&self, language: Language, id: &str) -> Option<&str> {
        self.pack(language)?.achievements.get(id).map(String::as_str)
    }

    pub fn problem(&self, language: Language, id: &str) -> Option<&str> {
        self.pack(language)?.problems.get(id).map(String::as_str)
    }

    pub fn investor(&self, language: Language, id: &str) -> Option<&str> {
        self.pack(language)?.investor.get(id).map(String::as_str)
    }

    pub fn heading(&self, language: Language, heading: Heading) -> &str {
        let Some(pack) = self.pack(language) else {
            return match heading {
                Heading::Achievements => "Achievements:",
                Heading::Problems => "Problems:",
                Heading::Investor => "Highlights:",
            };
        };
        match heading {
            Heading::Achievements => &pack.headings.achievements,
            Heading::Problems => &pack.headings.problems,
            Heading::Investor => &pack.headings.investor,
        }
    }
}

/// Substitute every `{name}` slot with its value. Unknown slots stay as-is.
pub fn fill(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

/// Format an integer with `,` thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(key, text)| (key.to_string(), text.to_string()))
        .collect()
}

fn lines(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|line| line.to_string()).collect()
}

fn english() -> LanguagePack {
    LanguagePack {
        openings: Openings {
            healthy: lines(&[
                "Your node is thriving! Everything is running smoothly.",
                "Excellent performance! The network is operating at peak efficiency.",
                "Outstanding! Your node is a shining example of careful craftsmanship.",
            ]),
            warning: lines(&[
                "Attention needed: some performance variations were detected.",
                "Your node is working well, but there is room for optimization.",
                "Everything is functional, but a few areas deserve a closer look.",
            ]),
            critical: lines(&[
                "Immediate action required: your node needs your attention.",
                "Critical situation detected. Let's work through it together.",
                "Your node is facing challenges that require prompt resolution.",
            ]),
        },
        stories: HashMap::from([
            (
                "throughput".to_string(),
                map(&[
                    ("excellent", "Your network is processing {value} transactions per second - outstanding throughput!"),
                    ("good", "Processing {value} TPS steadily. The network is performing well."),
                    ("low", "Transaction throughput at {value} TPS. Something may be slowing things down."),
                    ("trend_up", "🚀 TPS is climbing! Up {change}% since the last update."),
                    ("trend_down", "📉 TPS dropped by {change}% - this might indicate network congestion."),
                ]),
            ),
            (
                "finality".to_string(),
                map(&[
                    ("fast", "Lightning fast finality at {value}ms! Transactions confirm almost instantly."),
                    ("normal", "Finality time is {value}ms - well within the expected range."),
                    ("slow", "Finality is taking {value}ms. Validators may be lagging."),
                    ("trend_better", "✨ Finality is improving! {change}% faster than before."),
                    ("trend_worse", "⚠️ Finality slowed by {change}% - validators might need attention."),
                ]),
            ),
            (
                "uptime".to_string(),
                map(&[
                    ("perfect", "💎 {value}% uptime! Your node hasn't missed a beat."),
                    ("excellent", "Outstanding {value}% uptime - your reliability is exemplary."),
                    ("good", "{value}% uptime - solid performance with minimal interruptions."),
                    ("concerning", "{value}% uptime - recent downtime deserves investigation."),
                ]),
            ),
            (
                "validators".to_string(),
                map(&[
                    ("all_healthy", "All {count} validators are performing perfectly! 💪"),
                    ("mostly_healthy", "{healthy} of {count} validators running strong."),
                    ("some_issues", "{issues} of {count} validators need attention."),
                    ("critical", "⚠️ Multiple validators are reporting critical issues - immediate action needed."),
                ]),
            ),
            (
                "network".to_string(),
                map(&[
                    ("growing", "🌱 Network expanding! {new} new peers connected, {count} in total."),
                    ("stable", "Network stable with {count} active peers maintaining consensus."),
                    ("shrinking", "⚠️ Peer count declining. {lost} peers disconnected, {count} remain."),
                ]),
            ),
        ]),
        achievements: map(&[
            ("first_block", "🎉 GENESIS! Your first block is now part of network history!"),
            ("hundred_blocks", "💯 100 blocks produced! You're building the foundation."),
            ("thousand_blocks", "🏆 1000 BLOCKS MILESTONE! You're a pillar of the network."),
            ("uptime_week", "⏱️ 7 DAYS UPTIME! Your dedication is remarkable."),
            ("uptime_month", "🌟 30 DAYS UPTIME! You've achieved elite validator status."),
            ("high_tps", "🚀 SPEED RECORD! {value} TPS - you're pushing the limits!"),
            ("fast_finality", "⚡ SUB-SECOND FINALITY! {value}ms - near-instant confirmation!"),
            ("peer_growth", "🌐 NETWORK EXPANSION! {count} peers - you're highly connected!"),
            ("validator_join", "🤝 New validator joined! {count} validators now secure the network."),
        ]),
        problems: map(&[
            ("low_uptime", "⏳ Uptime at {value}% - the node is missing service windows."),
            ("slow_finality", "🐢 Finality at {value}ms exceeds one second - investigate validator performance."),
            ("low_throughput", "📉 Throughput at {value} TPS is below the optimal range."),
            ("mempool_backlog", "📊 {count} transactions waiting - the network is experiencing high demand."),
        ]),
        investor: map(&[
            ("network_value", "Your node secures ${value} in network value through {blocks} blocks."),
            ("transaction_volume", "${value} in transaction volume processed in the last 24 hours."),
            ("reliability_score", "{score}/100 reliability score - exceeding industry standards."),
        ]),
        headings: Headings {
            achievements: "🏆 Recent Achievements:".to_string(),
            problems: "⚠️ Attention Needed:".to_string(),
            investor: "💼 Investor Highlights:".to_string(),
        },
    }
}

fn arabic() -> LanguagePack {
    LanguagePack {
        openings: Openings {
            healthy: lines(&[
                "عقدتك تعمل بتميز! كل شيء يسير بسلاسة.",
                "أداء ممتاز! شبكتك تعمل بأقصى كفاءة.",
                "متميز! عقدتك مثال ساطع على الإتقان.",
            ]),
            warning: lines(&[
                "انتباه مطلوب: لاحظنا بعض التغيرات في الأداء.",
                "عقدتك تعمل بشكل جيد، لكن هناك مجال للتحسين.",
                "كل شيء يعمل، لكن دعنا نعالج بعض النقاط معاً.",
            ]),
            critical: lines(&[
                "إجراء فوري مطلوب: عقدتك تحتاج انتباهك.",
                "حالة حرجة اكتُشفت. دعنا نعمل معاً لحل هذا.",
                "عقدتك تواجه تحديات تتطلب حلاً سريعاً.",
            ]),
        },
        stories: HashMap::from([
            (
                "throughput".to_string(),
                map(&[
                    ("excellent", "شبكتك تعالج {value} معاملة في الثانية - إنتاجية رائعة!"),
                    ("good", "معالجة {value} معاملة/ثانية بثبات. شبكتك تعمل بشكل جيد."),
                    ("low", "إنتاجية المعاملات عند {value}/ثانية. دعنا نستقصي ما قد يبطئ الأمور."),
                    ("trend_up", "🚀 المعاملات تتصاعد! زادت بنسبة {change}% منذ التحديث الأخير."),
                    ("trend_down", "📉 المعاملات انخفضت بنسبة {change}% - قد يشير لازدحام الشبكة."),
                ]),
            ),
            (
                "finality".to_string(),
                map(&[
                    ("fast", "تأكيد سريع كالبرق عند {value}ملي ثانية! المعاملات تُؤكد فوراً تقريباً."),
                    ("normal", "وقت التأكيد {value}ملي ثانية - في النطاق المتوقع تماماً."),
                    ("slow", "التأكيد يستغرق {value}ملي ثانية. قد يشير لتأخير المدققين."),
                    ("trend_better", "✨ التأكيد يتحسن! أسرع بنسبة {change}% من قبل."),
                    ("trend_worse", "⚠️ التأكيد يتباطأ بنسبة {change}% - المدققون قد يحتاجون انتباهاً."),
                ]),
            ),
            (
                "uptime".to_string(),
                map(&[
                    ("perfect", "💎 وقت تشغيل مثالي {value}%! عقدتك لم تتعثر لحظة واحدة."),
                    ("excellent", "وقت تشغيل متميز {value}% - موثوقيتك مثالية."),
                    ("good", "وقت تشغيل {value}% - أداء قوي مع انقطاعات قليلة."),
                    ("concerning", "وقت تشغيل {value}% - دعنا نستقصي أحداث التوقف الأخيرة."),
                ]),
            ),
            (
                "validators".to_string(),
                map(&[
                    ("all_healthy", "كل المدققين الـ {count} يعملون بشكل مثالي! 💪"),
                    ("mostly_healthy", "{healthy} من {count} مدقق يعمل بقوة."),
                    ("some_issues", "{issues} مدقق يحتاج انتباهاً من أصل {count}."),
                    ("critical", "⚠️ عدة مدققين يبلغون عن مشاكل حرجة - إجراء فوري مطلوب."),
                ]),
            ),
            (
                "network".to_string(),
                map(&[
                    ("growing", "🌱 الشبكة تتوسع! {new} نقطة اتصال جديدة، والمجموع {count}."),
                    ("stable", "الشبكة مستقرة مع {count} نقطة اتصال نشطة تحافظ على التوافق."),
                    ("shrinking", "⚠️ عدد نقاط الاتصال ينخفض. {lost} نقطة انفصلت، وتبقى {count}."),
                ]),
            ),
        ]),
        achievements: map(&[
            ("first_block", "🎉 البداية! كتلتك الأولى أصبحت جزءاً من تاريخ الشبكة!"),
            ("hundred_blocks", "💯 100 كتلة أُنتجت! أنت تبني الأساس."),
            ("thousand_blocks", "🏆 إنجاز 1000 كتلة! أنت ركيزة الشبكة."),
            ("uptime_week", "⏱️ 7 أيام تشغيل! تفانيك رائع."),
            ("uptime_month", "🌟 30 يوماً تشغيل! حققت مكانة مدقق نخبة."),
            ("high_tps", "🚀 رقم قياسي للسرعة! {value} معاملة/ثانية - تدفع الحدود!"),
            ("fast_finality", "⚡ تأكيد دون الثانية! {value}ملي ثانية - تأكيد شبه فوري!"),
            ("peer_growth", "🌐 توسع الشبكة! {count} نقطة اتصال - أنت متصل بقوة!"),
            ("validator_join", "🤝 مدقق جديد انضم! {count} مدققين يؤمّنون الشبكة الآن."),
        ]),
        problems: map(&[
            ("low_uptime", "⏳ وقت التشغيل {value}% - العقدة تفقد فترات من الخدمة."),
            ("slow_finality", "🐢 التأكيد يستغرق {value}ملي ثانية، أكثر من ثانية - راجع أداء المدققين."),
            ("low_throughput", "📉 الإنتاجية {value} معاملة/ثانية - أقل من النطاق الأمثل."),
            ("mempool_backlog", "📊 {count} معاملة في الانتظار - الشبكة تشهد طلباً مرتفعاً."),
        ]),
        investor: map(&[
            ("network_value", "عقدتك تؤمن ${value} في قيمة الشبكة عبر {blocks} كتلة."),
            ("transaction_volume", "${value} في حجم المعاملات معالج في آخر 24 ساعة."),
            ("reliability_score", "نقاط موثوقية {score}/100 - تتجاوز معايير الصناعة."),
        ]),
        headings: Headings {
            achievements: "🏆 إنجازات حديثة:".to_string(),
            problems: "⚠️ انتباه مطلوب:".to_string(),
            investor: "💼 أبرز نقاط المستثمرين:".to_string(),
        },
    }
}
