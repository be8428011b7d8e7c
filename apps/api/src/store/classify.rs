//! Free-text classification: region, skills and seniority from job text.
//!
//! These are best-effort keyword heuristics over fixed tables, not
//! guaranteed-correct classification. Matching is done on whole tokens or
//! whole phrases so that short terms do not fire inside longer words
//! ("oman" must not match "romania", "java" must not match "javascript").

use crate::models::job::{ExperienceLevel, Region};

/// Maximum number of skills kept per job.
pub const MAX_EXTRACTED_SKILLS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Lookup tables
// ────────────────────────────────────────────────────────────────────────────

const MENA_TERMS: &[&str] = &[
    "mena",
    "middle east",
    "north africa",
    "gcc",
    "egypt",
    "cairo",
    "alexandria",
    "giza",
    "saudi arabia",
    "ksa",
    "riyadh",
    "jeddah",
    "dammam",
    "uae",
    "united arab emirates",
    "dubai",
    "abu dhabi",
    "sharjah",
    "qatar",
    "doha",
    "kuwait",
    "bahrain",
    "manama",
    "oman",
    "muscat",
    "jordan",
    "amman",
    "lebanon",
    "beirut",
    "morocco",
    "casablanca",
    "rabat",
    "tunisia",
    "tunis",
    "algeria",
    "algiers",
    "libya",
    "tripoli",
    "iraq",
    "baghdad",
    "erbil",
    "syria",
    "damascus",
    "palestine",
    "ramallah",
    "yemen",
];

const SSA_TERMS: &[&str] = &[
    "sub-saharan",
    "sub saharan",
    "africa",
    "nigeria",
    "lagos",
    "abuja",
    "kenya",
    "nairobi",
    "mombasa",
    "ghana",
    "accra",
    "south africa",
    "johannesburg",
    "cape town",
    "durban",
    "pretoria",
    "ethiopia",
    "addis ababa",
    "rwanda",
    "kigali",
    "uganda",
    "kampala",
    "tanzania",
    "dar es salaam",
    "senegal",
    "dakar",
    "ivory coast",
    "cote d'ivoire",
    "abidjan",
    "cameroon",
    "douala",
    "zambia",
    "lusaka",
    "zimbabwe",
    "harare",
    "botswana",
    "namibia",
    "mozambique",
    "maputo",
    "angola",
    "luanda",
];

/// (term as it appears in text, canonical skill name)
///
/// Skills that are also everyday words ("go", "rest", "spring", "swift") are
/// only listed in phrase forms.
const SKILL_VOCABULARY: &[(&str, &str)] = &[
    ("python", "python"),
    ("django", "django"),
    ("flask", "flask"),
    ("fastapi", "fastapi"),
    ("javascript", "javascript"),
    ("typescript", "typescript"),
    ("react", "react"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("angular", "angular"),
    ("vue", "vue"),
    ("vue.js", "vue"),
    ("node.js", "node.js"),
    ("nodejs", "node.js"),
    ("node", "node.js"),
    ("java", "java"),
    ("spring boot", "spring"),
    ("spring framework", "spring"),
    ("kotlin", "kotlin"),
    ("swiftui", "swift"),
    ("swift programming", "swift"),
    ("c#", "c#"),
    ("asp.net", "asp.net"),
    ("c++", "c++"),
    ("golang", "go"),
    ("rust", "rust"),
    ("php", "php"),
    ("laravel", "laravel"),
    ("ruby", "ruby"),
    ("rails", "rails"),
    ("sql", "sql"),
    ("postgresql", "postgresql"),
    ("postgres", "postgresql"),
    ("mysql", "mysql"),
    ("mongodb", "mongodb"),
    ("redis", "redis"),
    ("docker", "docker"),
    ("kubernetes", "kubernetes"),
    ("k8s", "kubernetes"),
    ("aws", "aws"),
    ("azure", "azure"),
    ("gcp", "gcp"),
    ("terraform", "terraform"),
    ("linux", "linux"),
    ("git", "git"),
    ("ci/cd", "ci/cd"),
    ("machine learning", "machine learning"),
    ("deep learning", "deep learning"),
    ("tensorflow", "tensorflow"),
    ("pytorch", "pytorch"),
    ("pandas", "pandas"),
    ("data analysis", "data analysis"),
    ("excel", "excel"),
    ("power bi", "power bi"),
    ("tableau", "tableau"),
    ("figma", "figma"),
    ("flutter", "flutter"),
    ("android", "android"),
    ("ios", "ios"),
    ("graphql", "graphql"),
    ("rest api", "rest api"),
    ("rest apis", "rest api"),
    ("restful", "rest api"),
    ("agile", "agile"),
    ("scrum", "scrum"),
    ("communication", "communication"),
    ("leadership", "leadership"),
    ("teamwork", "teamwork"),
    ("problem solving", "problem solving"),
    ("problem-solving", "problem solving"),
    ("project management", "project management"),
];

/// Seniority terms checked against the job title.
const TITLE_LEVEL_TERMS: &[(&str, ExperienceLevel)] = &[
    ("head of", ExperienceLevel::Executive),
    ("director", ExperienceLevel::Executive),
    ("vice president", ExperienceLevel::Executive),
    ("vp", ExperienceLevel::Executive),
    ("chief", ExperienceLevel::Executive),
    ("cto", ExperienceLevel::Executive),
    ("principal", ExperienceLevel::Lead),
    ("staff", ExperienceLevel::Lead),
    ("lead", ExperienceLevel::Lead),
    ("senior", ExperienceLevel::Senior),
    ("sr", ExperienceLevel::Senior),
    ("mid-level", ExperienceLevel::Mid),
    ("mid level", ExperienceLevel::Mid),
    ("intermediate", ExperienceLevel::Mid),
    ("junior", ExperienceLevel::Junior),
    ("jr", ExperienceLevel::Junior),
    ("entry level", ExperienceLevel::Junior),
    ("entry-level", ExperienceLevel::Junior),
    ("graduate", ExperienceLevel::Junior),
    ("intern", ExperienceLevel::Junior),
    ("internship", ExperienceLevel::Junior),
    ("trainee", ExperienceLevel::Junior),
];

/// Descriptions use "lead"/"staff" loosely, so only explicit phrases count.
const DESCRIPTION_LEVEL_TERMS: &[(&str, ExperienceLevel)] = &[
    ("executive level", ExperienceLevel::Executive),
    ("director level", ExperienceLevel::Executive),
    ("tech lead", ExperienceLevel::Lead),
    ("team lead", ExperienceLevel::Lead),
    ("senior level", ExperienceLevel::Senior),
    ("senior-level", ExperienceLevel::Senior),
    ("mid-level", ExperienceLevel::Mid),
    ("mid level", ExperienceLevel::Mid),
    ("entry level", ExperienceLevel::Junior),
    ("entry-level", ExperienceLevel::Junior),
    ("junior", ExperienceLevel::Junior),
    ("internship", ExperienceLevel::Junior),
];

// ────────────────────────────────────────────────────────────────────────────
// Tokenization
// ────────────────────────────────────────────────────────────────────────────

/// Lowercases and splits on anything that is not part of a term, returning
/// the tokens joined by single spaces and padded with a space on each side,
/// so a term matches iff `" {term} "` is a substring.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len() + 2);
    out.push(' ');
    for raw in lowered.split(|c: char| !(c.is_alphanumeric() || "+#./-'".contains(c))) {
        let token = raw.trim_matches(|c: char| ".-/'".contains(c));
        if token.is_empty() {
            continue;
        }
        out.push_str(token);
        out.push(' ');
    }
    out
}

/// Byte position of `term` in already-normalized text, on token boundaries.
pub(crate) fn find_term(normalized: &str, term: &str) -> Option<usize> {
    normalized.find(&format!(" {term} "))
}

pub(crate) fn contains_any(normalized: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| find_term(normalized, t).is_some())
}

// ────────────────────────────────────────────────────────────────────────────
// Classifiers
// ────────────────────────────────────────────────────────────────────────────

/// MENA is checked first so "North Africa" never falls into Sub-Saharan Africa.
pub fn classify_region(location: &str) -> Region {
    let normalized = normalize_text(location);
    if contains_any(&normalized, MENA_TERMS) {
        Region::Mena
    } else if contains_any(&normalized, SSA_TERMS) {
        Region::SubSaharanAfrica
    } else {
        Region::Other
    }
}

/// Up to five known skills, in order of first appearance in the text.
pub fn extract_skills(description: &str) -> Vec<String> {
    let normalized = normalize_text(description);
    let mut hits: Vec<(usize, &str)> = SKILL_VOCABULARY
        .iter()
        .filter_map(|(term, canonical)| find_term(&normalized, term).map(|pos| (pos, *canonical)))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut skills: Vec<String> = Vec::new();
    for (_, canonical) in hits {
        if skills.iter().any(|s| s == canonical) {
            continue;
        }
        skills.push(canonical.to_string());
        if skills.len() == MAX_EXTRACTED_SKILLS {
            break;
        }
    }
    skills
}

/// Canonical name for a whole skill term ("ReactJS" -> "react"), if known.
pub fn canonical_skill(term: &str) -> Option<&'static str> {
    let needle = term.trim().to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, canonical)| *canonical)
}

/// Seniority from the title, then explicit description phrases, then "N+ years".
pub fn detect_experience_level(title: &str, description: &str) -> ExperienceLevel {
    let title_norm = normalize_text(title);
    if let Some(level) = first_level(&title_norm, TITLE_LEVEL_TERMS) {
        return level;
    }
    let description_norm = normalize_text(description);
    if let Some(level) = first_level(&description_norm, DESCRIPTION_LEVEL_TERMS) {
        return level;
    }
    match required_years(&description_norm) {
        Some(years) => ExperienceLevel::from_years(f64::from(years)),
        None => ExperienceLevel::Unknown,
    }
}

fn first_level(normalized: &str, table: &[(&str, ExperienceLevel)]) -> Option<ExperienceLevel> {
    table
        .iter()
        .find(|(term, _)| find_term(normalized, term).is_some())
        .map(|(_, level)| *level)
}

/// Finds patterns like "5+ years" or "3 yrs"; returns the first number found.
fn required_years(normalized: &str) -> Option<u32> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        let number = pair[0].trim_end_matches('+').parse::<u32>().ok()?;
        let unit = pair[1];
        (unit.starts_with("year") || unit.starts_with("yr")).then_some(number)
    })
}
