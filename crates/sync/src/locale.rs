// Locale resolution for header cells.
//
// A cell resolves either as a tag (`de`, `pt-BR`, `zh_Hant`, `es-419`) or as
// an English display name (`German`, `Portuguese (Brazil)`).

use std::collections::HashMap;
use std::sync::OnceLock;

/// ISO 639 language codes with English names.
const LANGUAGES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("am", "Amharic"),
    ("ar", "Arabic"),
    ("as", "Assamese"),
    ("ast", "Asturian"),
    ("az", "Azerbaijani"),
    ("be", "Belarusian"),
    ("bg", "Bulgarian"),
    ("bn", "Bangla"),
    ("bo", "Tibetan"),
    ("br", "Breton"),
    ("bs", "Bosnian"),
    ("ca", "Catalan"),
    ("ckb", "Central Kurdish"),
    ("co", "Corsican"),
    ("cs", "Czech"),
    ("cy", "Welsh"),
    ("da", "Danish"),
    ("de", "German"),
    ("dv", "Divehi"),
    ("el", "Greek"),
    ("en", "English"),
    ("eo", "Esperanto"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("eu", "Basque"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fil", "Filipino"),
    ("fo", "Faroese"),
    ("fr", "French"),
    ("fy", "Western Frisian"),
    ("ga", "Irish"),
    ("gd", "Scottish Gaelic"),
    ("gl", "Galician"),
    ("gu", "Gujarati"),
    ("ha", "Hausa"),
    ("haw", "Hawaiian"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("hy", "Armenian"),
    ("id", "Indonesian"),
    ("ig", "Igbo"),
    ("is", "Icelandic"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("jv", "Javanese"),
    ("ka", "Georgian"),
    ("kk", "Kazakh"),
    ("kl", "Kalaallisut"),
    ("km", "Khmer"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("ku", "Kurdish"),
    ("ky", "Kyrgyz"),
    ("la", "Latin"),
    ("lb", "Luxembourgish"),
    ("lo", "Lao"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("mg", "Malagasy"),
    ("mi", "Maori"),
    ("mk", "Macedonian"),
    ("ml", "Malayalam"),
    ("mn", "Mongolian"),
    ("mr", "Marathi"),
    ("ms", "Malay"),
    ("mt", "Maltese"),
    ("my", "Burmese"),
    ("nb", "Norwegian Bokmal"),
    ("ne", "Nepali"),
    ("nl", "Dutch"),
    ("nn", "Norwegian Nynorsk"),
    ("no", "Norwegian"),
    ("oc", "Occitan"),
    ("or", "Odia"),
    ("pa", "Punjabi"),
    ("pl", "Polish"),
    ("ps", "Pashto"),
    ("pt", "Portuguese"),
    ("qu", "Quechua"),
    ("rm", "Romansh"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("rw", "Kinyarwanda"),
    ("sa", "Sanskrit"),
    ("sd", "Sindhi"),
    ("se", "Northern Sami"),
    ("si", "Sinhala"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("so", "Somali"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("tg", "Tajik"),
    ("th", "Thai"),
    ("ti", "Tigrinya"),
    ("tk", "Turkmen"),
    ("tr", "Turkish"),
    ("tt", "Tatar"),
    ("ug", "Uyghur"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("uz", "Uzbek"),
    ("vi", "Vietnamese"),
    ("wo", "Wolof"),
    ("xh", "Xhosa"),
    ("yi", "Yiddish"),
    ("yo", "Yoruba"),
    ("yue", "Cantonese"),
    ("zh", "Chinese"),
    ("zu", "Zulu"),
];

/// ISO 3166 / UN M.49 regions with English names.
const REGIONS: &[(&str, &str)] = &[
    ("001", "World"),
    ("419", "Latin America"),
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BD", "Bangladesh"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("BR", "Brazil"),
    ("BY", "Belarus"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EG", "Egypt"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("HK", "Hong Kong SAR"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IR", "Iran"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KE", "Kenya"),
    ("KR", "Korea"),
    ("LU", "Luxembourg"),
    ("MO", "Macao SAR"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NG", "Nigeria"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PK", "Pakistan"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RS", "Serbia"),
    ("RU", "Russia"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("SK", "Slovakia"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("VE", "Venezuela"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
];

/// ISO 15924 scripts with the names used in display strings.
const SCRIPTS: &[(&str, &str)] = &[
    ("Arab", "Arabic"),
    ("Cyrl", "Cyrillic"),
    ("Hans", "Simplified"),
    ("Hant", "Traditional"),
    ("Latn", "Latin"),
];

/// Precomputed lookup tables, built once per process.
#[derive(Debug)]
pub struct LocaleTable {
    /// lowercase code -> canonical code
    languages: HashMap<String, &'static str>,
    /// (lowercase display name, tag), scanned linearly
    display_names: Vec<(String, String)>,
}

static TABLE: OnceLock<LocaleTable> = OnceLock::new();

/// The shared locale table.
pub fn locale_table() -> &'static LocaleTable {
    TABLE.get_or_init(LocaleTable::build)
}

impl LocaleTable {
    fn build() -> Self {
        let languages = LANGUAGES
            .iter()
            .map(|(code, _)| (code.to_string(), *code))
            .collect();

        let mut display_names = Vec::with_capacity(LANGUAGES.len() * 2);
        for (code, name) in LANGUAGES {
            display_names.push((name.to_lowercase(), code.to_string()));
        }
        // Qualified names for the combinations commonly used as headers.
        for (code, name) in LANGUAGES {
            for (script, script_name) in SCRIPTS {
                if matches!((*code, *script), ("zh", "Hans") | ("zh", "Hant") | ("sr", "Cyrl") | ("sr", "Latn")) {
                    display_names.push((
                        format!("{name} ({script_name})").to_lowercase(),
                        format!("{code}-{script}"),
                    ));
                }
            }
            for (region, region_name) in REGIONS {
                display_names.push((
                    format!("{name} ({region_name})").to_lowercase(),
                    format!("{code}-{region}"),
                ));
            }
        }

        Self {
            languages,
            display_names,
        }
    }

    /// Resolve a header cell to a canonical locale tag.
    ///
    /// Tries a tag parse first, then an exact (case-insensitive) display
    /// name match.
    pub fn resolve(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(tag) = self.parse_tag(text) {
            return Some(tag);
        }
        let lower = text.to_lowercase();
        self.display_names
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, tag)| tag.clone())
    }

    /// Parse `language[-Script][-REGION]`, `-` or `_` separated.
    pub fn parse_tag(&self, text: &str) -> Option<String> {
        let mut parts = text.split(['-', '_']);
        let language = parts.next()?.to_ascii_lowercase();
        let language = *self.languages.get(&language)?;
        let mut tag = language.to_string();

        let mut script_seen = false;
        let mut region_seen = false;
        for part in parts {
            if !script_seen && !region_seen && part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                let mut chars = part.chars();
                let first = chars.next()?.to_ascii_uppercase();
                let rest: String = chars.map(|c| c.to_ascii_lowercase()).collect();
                tag.push('-');
                tag.push(first);
                tag.push_str(&rest);
                script_seen = true;
            } else if !region_seen && part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                tag.push('-');
                tag.push_str(&part.to_ascii_uppercase());
                region_seen = true;
            } else if !region_seen && part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()) {
                tag.push('-');
                tag.push_str(part);
                region_seen = true;
            } else {
                return None;
            }
        }
        Some(tag)
    }

    /// English display name of a canonical tag, if known.
    pub fn display_name(&self, tag: &str) -> Option<&'static str> {
        let language = tag.split('-').next()?;
        LANGUAGES
            .iter()
            .find(|(code, _)| *code == language)
            .map(|(_, name)| *name)
    }
}

/// Shorthand for [`LocaleTable::resolve`] on the shared table.
pub fn resolve_locale(text: &str) -> Option<String> {
    locale_table().resolve(text)
}

/// Canonical form of a language tag, or `None` when it does not parse.
pub fn canonical_tag(text: &str) -> Option<String> {
    locale_table().parse_tag(text.trim())
}
