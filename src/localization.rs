use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use unic_langid::LanguageIdentifier;

/// Language used when the user's language is unknown or unsupported
pub const DEFAULT_LANGUAGE: &str = "ru";

/// Embedded message catalogs, one per supported language
const CATALOGS: [(&str, &str); 2] = [
    ("ru", include_str!("../locales/ru/main.ftl")),
    ("en", include_str!("../locales/en/main.ftl")),
];

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every embedded catalog loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in CATALOGS {
            let locale: LanguageIdentifier = language.parse()?;
            bundles.insert(language.to_string(), Self::create_bundle(locale, source)?);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram shows the bidi isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("invalid catalog for {locale}: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("duplicate messages for {locale}: {errors:?}"))?;

        Ok(bundle)
    }

    /// Supported language codes
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Get a localized message in a specific language, falling back to the default one
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let Some(bundle) = self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        else {
            return format!("Missing translation: {key}");
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (k, v) in args {
                fluent_args.set(*k, *v);
            }
            fluent_args
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }

    /// Get a localized message with no arguments
    pub fn t(&self, key: &str, language: &str) -> String {
        self.get_message_in_language(key, language, None)
    }

    /// Get a localized message with simple string arguments
    pub fn t_args(&self, key: &str, args: &[(&str, &str)], language: &str) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }

    /// Whether `text` is the cancel button label in any supported language
    pub fn is_cancel_label(&self, text: &str) -> bool {
        let text = text.trim();
        self.bundles
            .keys()
            .any(|language| self.t("button-cancel", language) == text)
    }
}

/// Map a Telegram `language_code` (e.g. `en-US`) to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(str::to_lowercase);

    match primary.as_deref() {
        Some("en") => "en",
        _ => DEFAULT_LANGUAGE,
    }
}
