//! Relevance predicates over title, company and description.
//!
//! Every word list is matched as a case-insensitive substring. A rule is
//! active only when its list is non-empty.

use std::fmt;

use whatlang::Lang;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::events::{CrawlEvent, EventSink};
use crate::models::job::JobRecord;

/// ISO 639-1 codes accepted in `LANGUAGES`, mapped to ISO 639-3.
const ISO_639_1: &[(&str, &str)] = &[
    ("en", "eng"),
    ("de", "deu"),
    ("fr", "fra"),
    ("es", "spa"),
    ("it", "ita"),
    ("pt", "por"),
    ("nl", "nld"),
    ("pl", "pol"),
    ("ru", "rus"),
    ("uk", "ukr"),
    ("sv", "swe"),
    ("da", "dan"),
    ("fi", "fin"),
    ("no", "nob"),
    ("cs", "ces"),
    ("tr", "tur"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("zh", "cmn"),
    ("ar", "ara"),
    ("he", "heb"),
    ("hi", "hin"),
    ("ro", "ron"),
    ("hu", "hun"),
    ("el", "ell"),
    ("vi", "vie"),
];

/// Why a job was dropped; the first failing rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    DescriptionWord(String),
    TitleWord(String),
    NoTitleKeyword,
    Language(&'static str),
    /// The detector only guessed; too little text to trust.
    UncertainLanguage(&'static str),
    CompanyWord(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::DescriptionWord(w) => write!(f, "description mentions '{w}'"),
            Rejection::TitleWord(w) => write!(f, "title mentions '{w}'"),
            Rejection::NoTitleKeyword => write!(f, "title has none of the required keywords"),
            Rejection::Language(code) => write!(f, "description language '{code}' not accepted"),
            Rejection::UncertainLanguage(code) => {
                write!(f, "description language unclear (best guess '{code}')")
            }
            Rejection::CompanyWord(w) => write!(f, "company matches '{w}'"),
        }
    }
}

/// Resolve a language code (`en` or `eng`).
pub fn lang_from_code(code: &str) -> Option<Lang> {
    let code = code.trim().to_lowercase();
    let three = ISO_639_1
        .iter()
        .find(|(two, _)| *two == code)
        .map_or(code.as_str(), |&(_, three)| three);
    Lang::from_code(three)
}

/// `None` when the detector cannot decide (empty or non-alphabetic text).
/// The flag tells whether the guess is reliable.
pub fn detect_language(text: &str) -> Option<(Lang, bool)> {
    whatlang::detect(text).map(|info| (info.lang(), info.is_reliable()))
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    description_exclude: Vec<String>,
    title_exclude: Vec<String>,
    title_include: Vec<String>,
    languages: Vec<Lang>,
    company_exclude: Vec<String>,
}

impl RelevanceFilter {
    /// Fails on a language code the detector does not know.
    pub fn new(config: &CrawlConfig) -> Result<Self, AppError> {
        let lower = |words: &[String]| words.iter().map(|w| w.to_lowercase()).collect::<Vec<_>>();
        let languages = config
            .languages
            .iter()
            .map(|code| {
                lang_from_code(code)
                    .ok_or_else(|| AppError::Config(format!("LANGUAGES: unknown language '{code}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            description_exclude: lower(&config.description_exclude),
            title_exclude: lower(&config.title_exclude),
            title_include: lower(&config.title_include),
            languages,
            company_exclude: lower(&config.company_exclude),
        })
    }

    pub fn check(&self, job: &JobRecord) -> Result<(), Rejection> {
        let description = job.description.to_lowercase();
        if let Some(word) = find_any(&description, &self.description_exclude) {
            return Err(Rejection::DescriptionWord(word.to_string()));
        }

        let title = job.title.to_lowercase();
        if let Some(word) = find_any(&title, &self.title_exclude) {
            return Err(Rejection::TitleWord(word.to_string()));
        }
        if !self.title_include.is_empty() && find_any(&title, &self.title_include).is_none() {
            return Err(Rejection::NoTitleKeyword);
        }

        if let Some(rejection) = self.language_rejection(&job.description) {
            return Err(rejection);
        }

        let company = job.company.to_lowercase();
        if let Some(word) = find_any(&company, &self.company_exclude) {
            return Err(Rejection::CompanyWord(word.to_string()));
        }
        Ok(())
    }

    /// Drop irrelevant jobs, reporting each rejection.
    pub fn retain_relevant(&self, jobs: Vec<JobRecord>, events: &dyn EventSink) -> Vec<JobRecord> {
        self.partition(jobs, events).0
    }

    /// Split into (accepted, filtered). Every job lands in exactly one side.
    pub fn partition(
        &self,
        jobs: Vec<JobRecord>,
        events: &dyn EventSink,
    ) -> (Vec<JobRecord>, Vec<JobRecord>) {
        let mut accepted = Vec::new();
        let mut filtered = Vec::new();
        for job in jobs {
            match self.check(&job) {
                Ok(()) => accepted.push(job),
                Err(reason) => {
                    events.emit(CrawlEvent::Rejected {
                        title: job.title.clone(),
                        company: job.company.clone(),
                        reason,
                    });
                    filtered.push(job);
                }
            }
        }
        (accepted, filtered)
    }

    /// Why the language rule rejects `text`, if it does. A guess only
    /// counts as a match when it is reliable; undecidable text is accepted.
    pub fn language_rejection(&self, text: &str) -> Option<Rejection> {
        if self.languages.is_empty() {
            return None;
        }
        let (lang, reliable) = detect_language(text)?;
        if !self.languages.contains(&lang) {
            Some(Rejection::Language(lang.code()))
        } else if !reliable {
            Some(Rejection::UncertainLanguage(lang.code()))
        } else {
            None
        }
    }
}

fn find_any<'a>(haystack: &str, words: &'a [String]) -> Option<&'a str> {
    words
        .iter()
        .find(|w| haystack.contains(w.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::models::job::DESCRIPTION_NOT_FOUND;
    use crate::models::job::tests::job;

    const ENGLISH: &str = "We are looking for an experienced engineer to join our \
        infrastructure team. You will build and maintain the deployment pipelines, \
        monitor production systems and work closely with the developers to improve \
        the reliability of our services.";

    fn filter_with(edit: impl FnOnce(&mut CrawlConfig)) -> RelevanceFilter {
        let mut config = CrawlConfig::for_tests();
        edit(&mut config);
        RelevanceFilter::new(&config).unwrap()
    }

    fn titled(title: &str) -> JobRecord {
        job(title, "Acme", "2024-01-01", "https://x/1/")
    }

    #[test]
    fn test_title_exclude_wins_over_include() {
        let filter = filter_with(|c| {
            c.title_exclude = vec!["Toptal".into()];
            c.title_include = vec!["DevOps".into()];
        });

        assert_eq!(
            filter.check(&titled("DevOps Engineer at Toptal")),
            Err(Rejection::TitleWord("toptal".into()))
        );
        assert_eq!(filter.check(&titled("Senior DevOps Engineer")), Ok(()));
        assert_eq!(
            filter.check(&titled("Data Analyst")),
            Err(Rejection::NoTitleKeyword)
        );
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let filter = filter_with(|c| c.company_exclude = vec!["TOPTAL".into()]);
        let mut record = titled("DevOps Engineer");
        record.company = "toptal.com".into();
        assert_eq!(
            filter.check(&record),
            Err(Rejection::CompanyWord("toptal".into()))
        );
    }

    #[test]
    fn test_description_words() {
        let filter = filter_with(|c| c.description_exclude = vec!["Clearance".into()]);
        let record = titled("SRE").with_details("Active security clearance required".into(), None);
        assert_eq!(
            filter.check(&record),
            Err(Rejection::DescriptionWord("clearance".into()))
        );
        // Before enrichment the description is empty and the rule cannot fire.
        assert_eq!(filter.check(&titled("SRE")), Ok(()));
    }

    #[test]
    fn test_empty_lists_accept_everything() {
        let filter = filter_with(|_| {});
        assert_eq!(filter.check(&titled("Anything")), Ok(()));
    }

    #[test]
    fn test_language_rule() {
        let filter = filter_with(|c| c.languages = vec!["en".into()]);
        let english = titled("SRE").with_details(ENGLISH.into(), None);
        assert_eq!(filter.check(&english), Ok(()));

        let filter = filter_with(|c| c.languages = vec!["de".into()]);
        assert_eq!(filter.check(&english), Err(Rejection::Language("eng")));
    }

    #[test]
    fn test_undetectable_language_fails_open() {
        let filter = filter_with(|c| c.languages = vec!["de".into()]);
        let numeric = titled("SRE").with_details("12345 67890 !!!".into(), None);
        assert_eq!(detect_language(&numeric.description), None);
        assert_eq!(filter.check(&numeric), Ok(()));
        assert_eq!(filter.check(&titled("SRE")), Ok(()));
    }

    #[test]
    fn test_sentinel_description_fails_language_rule() {
        let missing = titled("SRE").with_details(DESCRIPTION_NOT_FOUND.into(), None);

        let filter = filter_with(|c| c.languages = vec!["en".into()]);
        assert!(matches!(
            filter.check(&missing),
            Err(Rejection::UncertainLanguage(_) | Rejection::Language(_))
        ));

        let filter = filter_with(|c| c.languages = vec!["ja".into()]);
        assert!(matches!(filter.check(&missing), Err(Rejection::Language(_))));
    }

    #[test]
    fn test_short_text_is_not_trusted() {
        let (_, reliable) = detect_language(DESCRIPTION_NOT_FOUND).unwrap();
        assert!(!reliable);
        let (lang, reliable) = detect_language(ENGLISH).unwrap();
        assert_eq!(lang, Lang::Eng);
        assert!(reliable);
    }

    #[test]
    fn test_partition_routes_each_job_once() {
        let filter = filter_with(|c| c.title_include = vec!["devops".into()]);
        let events = CollectingEventSink::default();
        let jobs = vec![titled("DevOps Engineer"), titled("Data Analyst")];

        let (accepted, filtered) = filter.partition(jobs, &events);

        assert_eq!(accepted.len(), 1);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Data Analyst");
        assert_eq!(events.count("filter.rejected"), 1);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(lang_from_code("en"), Some(Lang::Eng));
        assert_eq!(lang_from_code("DEU"), Some(Lang::Deu));
        assert_eq!(lang_from_code("xx"), None);

        let mut config = CrawlConfig::for_tests();
        config.languages = vec!["klingon".into()];
        assert!(RelevanceFilter::new(&config).is_err());
    }
}
