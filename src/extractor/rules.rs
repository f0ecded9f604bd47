use super::ExtractorError;
use regex::Regex;
use std::collections::HashSet;

/// One capitalised name word: "Jane", "O'Brien", "McDonald", "Smith-Jones".
const NAME_WORD: &str = r"\p{Lu}(?:'\p{Lu})?\p{Ll}+(?:\p{Lu}\p{Ll}+)?(?:-\p{Lu}\p{Ll}+)?";

pub const DEFAULT_EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

const DEFAULT_TITLE_KEYWORDS: &[&str] = &[
    "CEO", "CTO", "CFO", "COO", "CIO", "CMO", "CPO", "CRO", "CISO", "VP", "SVP", "EVP",
    "Founder", "Co-Founder", "Owner", "Partner", "Managing Partner", "Principal",
    "President", "Vice President", "Chairman", "Chairwoman", "Chairperson", "Board Member",
    "Director", "Managing Director", "Executive Director", "Chief Executive Officer",
    "Chief Technology Officer", "Chief Financial Officer", "Chief Operating Officer",
    "Chief Marketing Officer", "Chief", "Officer", "Head", "Lead", "Manager",
    "Project Manager", "Program Manager", "Product Manager", "Account Manager",
    "Engineer", "Developer", "Designer", "Architect", "Analyst", "Scientist", "Researcher",
    "Consultant", "Specialist", "Coordinator", "Administrator", "Supervisor", "Technician",
    "Recruiter", "Accountant", "Attorney", "Counsel", "Legal Counsel", "Editor",
    "Secretary", "Treasurer", "Assistant", "Associate", "Representative", "Executive",
    "Strategist", "Advisor", "Adviser",
];

const DEFAULT_NAME_STOP_WORDS: &[&str] = &[
    "Email", "E-mail", "Mail", "Contact", "Contacts", "Phone", "Tel", "Telephone", "Fax",
    "Mobile", "Call", "Send", "Write", "Meet", "About", "Our", "The", "Team", "Us", "Read",
    "More", "Learn", "Click", "Here", "Get", "In", "Touch", "Home", "Privacy", "Policy",
    "Terms", "Service", "Services", "Copyright", "All", "Rights", "Reserved", "Follow",
    "Join", "Welcome", "Office", "Sales", "Support", "Info", "Information", "Company",
    "Inc", "Ltd", "Llc", "Gmbh", "Group", "Street", "Road", "Avenue", "Suite", "Floor",
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    "January", "February", "March", "April", "May", "June", "July", "August",
    "September", "October", "November", "December", "Dear", "Hello", "Hi", "Thanks",
    "Regards", "Best", "Sincerely", "From", "To", "For", "And", "Or", "With",
];

/// Separators trimmed off a title once the name and email are removed.
const TITLE_SEPARATORS: &[char] = &[
    '-', '|', ',', ':', ';', '/', '\u{2022}', '\u{00b7}', '\u{2013}', '\u{2014}', '(', ')',
];

/// Heuristics driving extraction. All of it is data so callers can tune
/// patterns and keyword lists without touching the strategies.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub email_pattern: String,
    /// Capture group 1, when present, is taken as the name.
    pub name_pattern: String,
    pub title_keywords: Vec<String>,
    pub name_stop_words: Vec<String>,
    /// A container whose visible text is longer than this is not used to
    /// associate a name or title with an email.
    pub max_context_chars: usize,
    pub max_ancestor_depth: usize,
    pub max_title_chars: usize,
    /// Containers nested deeper than this below the candidate are not read
    /// for context.
    pub max_nesting: usize,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            email_pattern: DEFAULT_EMAIL_PATTERN.to_string(),
            name_pattern: format!(
                r"\b({word}(?:\s+(?:\p{{Lu}}\.\s+)?{word}){{1,3}})\b",
                word = NAME_WORD
            ),
            title_keywords: DEFAULT_TITLE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            name_stop_words: DEFAULT_NAME_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            max_context_chars: 400,
            max_ancestor_depth: 4,
            max_title_chars: 100,
            max_nesting: 256,
        }
    }
}

impl ExtractionRules {
    pub fn with_title_keywords(mut self, keywords: Vec<String>) -> Self {
        self.title_keywords = keywords;
        self
    }

    pub fn with_email_pattern(mut self, pattern: &str) -> Self {
        self.email_pattern = pattern.to_string();
        self
    }

    pub fn compile(&self) -> Result<CompiledRules, ExtractorError> {
        let email = Regex::new(&self.email_pattern)?;
        let name = Regex::new(&self.name_pattern)?;

        let mut keywords: Vec<&str> = self
            .title_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        // Longest first so "Vice President" wins over "President".
        keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let title = if keywords.is_empty() {
            None
        } else {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        let title_words = self
            .title_keywords
            .iter()
            .flat_map(|k| k.split_whitespace())
            .map(|w| w.to_lowercase())
            .collect();
        let stop_words = self
            .name_stop_words
            .iter()
            .map(|w| w.to_lowercase())
            .collect();

        Ok(CompiledRules {
            email,
            name,
            title,
            title_words,
            stop_words,
            max_context_chars: self.max_context_chars,
            max_ancestor_depth: self.max_ancestor_depth,
            max_title_chars: self.max_title_chars,
            max_nesting: self.max_nesting,
        })
    }
}

/// [`ExtractionRules`] with the patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    email: Regex,
    name: Regex,
    title: Option<Regex>,
    title_words: HashSet<String>,
    stop_words: HashSet<String>,
    pub(crate) max_context_chars: usize,
    pub(crate) max_ancestor_depth: usize,
    pub(crate) max_title_chars: usize,
    pub(crate) max_nesting: usize,
}

impl CompiledRules {
    pub fn find_emails<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.email.find_iter(text).map(|m| m.as_str())
    }

    pub fn first_email(&self, text: &str) -> Option<String> {
        self.email.find(text).map(|m| m.as_str().to_string())
    }

    pub fn distinct_emails(&self, text: &str) -> HashSet<String> {
        self.find_emails(text).map(|e| e.to_lowercase()).collect()
    }

    /// The first plausible person name in `segment`. Leading labels and
    /// trailing title words are cut off a candidate ("Contact Jane Smith
    /// Chief" -> "Jane Smith"); at least two name words must remain.
    pub fn find_name(&self, segment: &str) -> Option<String> {
        for captures in self.name.captures_iter(segment) {
            let candidate = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let words: Vec<&str> = candidate
                .split_whitespace()
                .skip_while(|w| self.is_stop_or_title_word(w))
                .take_while(|w| !self.is_stop_or_title_word(w))
                .collect();
            let real_words = words.iter().filter(|w| !w.ends_with('.')).count();

            if real_words >= 2 && !words.last().is_some_and(|w| w.ends_with('.')) {
                return Some(words.join(" "));
            }
        }
        None
    }

    /// A short segment naming a role, with the person's name, any email and
    /// label separators trimmed away.
    pub fn find_title(&self, segment: &str, name: Option<&str>) -> Option<String> {
        let title = self.title.as_ref()?;
        if segment.chars().count() > self.max_title_chars || !title.is_match(segment) {
            return None;
        }

        let mut remainder = self.email.replace_all(segment, " ").into_owned();
        if let Some(name) = name {
            remainder = remainder.replace(name, " ");
        }
        let remainder = super::collapse_whitespace(&remainder);
        let trimmed = remainder
            .trim_matches(|c: char| c.is_whitespace() || TITLE_SEPARATORS.contains(&c))
            .trim();

        if trimmed.is_empty() || !title.is_match(trimmed) {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn is_stop_or_title_word(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.stop_words.contains(&lower) || self.title_words.contains(&lower)
    }
}
