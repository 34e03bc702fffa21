//! Skill Category Table — the canonical, read-only skills inventory shared by every match.
//!
//! Entries are stored in their normalized form: `c++` is `cplusplus`, `node.js` is `nodejs`,
//! and so on, because the tokenizer rewrites those terms before splitting. Skills that still
//! contain a space, dot, or hyphen are "multi-token" and are matched by bounded substring
//! search over the cleaned text instead of single-token lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

// ────────────────────────────────────────────────────────────────────────────
// Table data
// ────────────────────────────────────────────────────────────────────────────

const SKILL_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "programming_languages",
        &[
            "python", "java", "javascript", "typescript", "cplusplus", "csharp", "php", "ruby",
            "go", "golang", "rust", "scala", "kotlin", "swift", "matlab", "perl", "lua",
            "haskell", "clojure", "erlang", "elixir", "dart", "objective-c", "visual basic",
            "vba", "cobol", "fortran", "assembly", "sql", "shell", "bash", "powershell",
        ],
    ),
    (
        "web_technologies",
        &[
            "html", "html5", "css", "css3", "sass", "scss", "bootstrap", "tailwind",
            "material-ui", "semantic-ui", "react", "reactjs", "angular", "angularjs", "vue",
            "vuejs", "svelte", "ember", "backbone", "jquery", "d3", "d3.js", "three.js",
            "webgl", "svg", "xml", "json", "ajax", "graphql", "websockets", "webrtc", "pwa",
            "responsive design",
        ],
    ),
    (
        "backend_frameworks",
        &[
            "django", "flask", "fastapi", "tornado", "pyramid", "express", "expressjs", "node",
            "nodejs", "koa", "hapi", "spring", "spring boot", "hibernate", "struts",
            "play framework", "laravel", "symfony", "codeigniter", "cakephp", "ruby on rails",
            "rails", "sinatra", "aspnet", "dotnet", "web api", "wcf", "wpf",
        ],
    ),
    (
        "databases",
        &[
            "mysql", "postgresql", "postgres", "sqlite", "mariadb", "oracle", "sql server",
            "sqlserver", "mssql", "db2", "mongodb", "couchdb", "couchbase", "dynamodb",
            "cassandra", "hbase", "neo4j", "influxdb", "timescaledb", "redis", "memcached",
            "elasticsearch", "solr", "lucene", "firebase", "firestore", "cosmos db",
        ],
    ),
    (
        "cloud_platforms",
        &[
            "aws", "amazon web services", "ec2", "s3", "rds", "lambda", "cloudfront", "azure",
            "microsoft azure", "azure functions", "gcp", "google cloud",
            "google cloud platform", "app engine", "compute engine", "digital ocean", "linode",
            "heroku", "netlify", "vercel", "cloudflare", "ibm cloud", "oracle cloud",
        ],
    ),
    (
        "devops_tools",
        &[
            "docker", "kubernetes", "k8s", "helm", "istio", "envoy", "consul", "terraform",
            "ansible", "puppet", "chef", "packer", "vagrant", "jenkins", "gitlab ci",
            "github actions", "travis ci", "circle ci", "teamcity", "azure devops",
            "cloudformation", "prometheus", "grafana", "elk stack", "logstash", "kibana",
            "fluentd", "nagios", "datadog", "new relic", "splunk",
        ],
    ),
    (
        "data_science",
        &[
            "pandas", "numpy", "scipy", "matplotlib", "seaborn", "plotly", "bokeh",
            "scikit-learn", "sklearn", "tensorflow", "keras", "pytorch", "jax", "xgboost",
            "lightgbm", "catboost", "opencv", "jupyter", "anaconda", "conda", "spark",
            "pyspark", "hadoop", "hive", "kafka", "airflow", "luigi", "prefect", "dask",
            "mlflow", "kubeflow",
        ],
    ),
    (
        "mobile_development",
        &[
            "android", "ios", "react native", "flutter", "xamarin", "ionic", "cordova",
            "unity", "unreal", "swift", "objective-c", "kotlin", "java", "dart", "csharp",
        ],
    ),
    (
        "testing_frameworks",
        &[
            "pytest", "unittest", "selenium", "playwright", "jest", "mocha", "jasmine",
            "karma", "cypress", "webdriver", "junit", "testng", "mockito", "cucumber",
            "rspec", "minitest", "phpunit",
        ],
    ),
    (
        "tools",
        &[
            "git", "github", "gitlab", "bitbucket", "jira", "confluence", "postman", "swagger",
            "figma", "sketch", "photoshop", "illustrator", "tableau", "powerbi", "excel",
        ],
    ),
    (
        "soft_skills",
        &[
            "leadership", "teamwork", "communication", "problem solving", "critical thinking",
            "analytical thinking", "creativity", "innovation", "project management",
            "time management", "attention to detail", "multitasking", "adaptability",
            "collaboration", "mentoring", "coaching", "presentation", "public speaking",
            "documentation", "customer service", "stakeholder management",
        ],
    ),
    (
        "methodologies",
        &[
            "agile", "scrum", "kanban", "lean", "waterfall", "devops", "cicd", "tdd",
            "test driven development", "bdd", "pair programming", "code review",
            "continuous integration", "continuous deployment", "microservices", "soa",
            "rest", "soap", "mvc", "mvvm", "clean architecture", "solid principles",
        ],
    ),
    (
        "certifications",
        &[
            "aws certified", "azure certified", "google cloud certified", "cisco certified",
            "microsoft certified", "oracle certified", "comptia", "cissp", "cism", "cisa",
            "pmp", "prince2", "itil", "scrum master", "product owner", "togaf",
        ],
    ),
];

/// Categories counted as "technical" in match statistics: languages, frameworks (web and
/// backend), databases and cloud platforms.
pub const TECHNICAL_CATEGORIES: &[&str] = &[
    "programming_languages",
    "web_technologies",
    "backend_frameworks",
    "databases",
    "cloud_platforms",
];

/// Categories reported in the per-category breakdown of a match result: the technical ones
/// plus tooling (devops and general).
pub const ANALYZED_CATEGORIES: &[&str] = &[
    "programming_languages",
    "web_technologies",
    "backend_frameworks",
    "databases",
    "cloud_platforms",
    "devops_tools",
    "tools",
];

/// Pseudo-category holding every non-stopword alphabetic token longer than two characters.
/// Never part of the canonical table; skills verification filters it down to real skills.
pub const GENERAL_KEYWORDS: &str = "general_keywords";

static STANDARD_TABLE: LazyLock<Arc<SkillTable>> =
    LazyLock::new(|| Arc::new(SkillTable::from_entries(SKILL_CATEGORIES)));

// ────────────────────────────────────────────────────────────────────────────
// SkillTable
// ────────────────────────────────────────────────────────────────────────────

/// Category name → ordered set of canonical skills, plus a reverse index for O(1) lookups.
#[derive(Debug)]
pub struct SkillTable {
    categories: BTreeMap<String, BTreeSet<String>>,
    skill_to_categories: HashMap<String, Vec<String>>,
}

impl SkillTable {
    /// The process-wide standard table, built once on first access.
    pub fn standard() -> Arc<SkillTable> {
        Arc::clone(&STANDARD_TABLE)
    }

    pub fn from_entries(entries: &[(&str, &[&str])]) -> Self {
        let mut categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut skill_to_categories: HashMap<String, Vec<String>> = HashMap::new();

        for (category, skills) in entries {
            let set = categories.entry(category.to_string()).or_default();
            for skill in *skills {
                let skill = skill.trim().to_lowercase();
                if skill.is_empty() {
                    continue;
                }
                if set.insert(skill.clone()) {
                    skill_to_categories
                        .entry(skill)
                        .or_default()
                        .push(category.to_string());
                }
            }
        }

        Self {
            categories,
            skill_to_categories,
        }
    }

    /// Iterates `(category, skills)` in category-name order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// All distinct skills across every category.
    pub fn all_skills(&self) -> BTreeSet<&str> {
        self.skill_to_categories.keys().map(String::as_str).collect()
    }

    pub fn skills_in_category(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.categories.get(category)
    }

    /// Case-insensitive exact lookup.
    pub fn contains(&self, skill: &str) -> bool {
        self.skill_to_categories.contains_key(&skill.to_lowercase())
    }

    /// Categories a skill belongs to, in table order. Empty when the skill is unknown.
    pub fn categorize_skill(&self, skill: &str) -> &[String] {
        self.skill_to_categories
            .get(&skill.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A skill that cannot survive word-boundary tokenization as a single token.
pub fn is_multi_token(skill: &str) -> bool {
    skill.chars().any(|c| !(c.is_alphanumeric() || c == '_'))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_has_expected_categories() {
        let table = SkillTable::standard();
        let names: Vec<&str> = table.category_names().collect();
        for expected in [
            "programming_languages",
            "databases",
            "cloud_platforms",
            "devops_tools",
            "data_science",
            "soft_skills",
            "methodologies",
            "certifications",
        ] {
            assert!(names.contains(&expected), "missing category {expected}");
        }
        assert!(!names.contains(&GENERAL_KEYWORDS));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let table = SkillTable::standard();
        assert!(table.contains("Python"));
        assert!(table.contains("KUBERNETES"));
        assert!(!table.contains("basket weaving"));
    }

    #[test]
    fn test_categorize_skill_reports_every_category() {
        let table = SkillTable::standard();
        let cats = table.categorize_skill("java");
        assert!(cats.iter().any(|c| c == "programming_languages"));
        assert!(cats.iter().any(|c| c == "mobile_development"));
        assert!(table.categorize_skill("nonexistent").is_empty());
    }

    #[test]
    fn test_table_stores_normalized_forms() {
        let table = SkillTable::standard();
        assert!(table.contains("cplusplus"));
        assert!(table.contains("csharp"));
        assert!(table.contains("nodejs"));
        assert!(!table.contains("c++"));
    }

    #[test]
    fn test_from_entries_dedups_and_lowercases() {
        let table = SkillTable::from_entries(&[("langs", &["Rust", "rust", " Go ", ""])]);
        let langs = table.skills_in_category("langs").unwrap();
        assert_eq!(langs.len(), 2);
        assert!(langs.contains("rust"));
        assert!(langs.contains("go"));
    }

    #[test]
    fn test_multi_token_detection() {
        assert!(is_multi_token("spring boot"));
        assert!(is_multi_token("scikit-learn"));
        assert!(is_multi_token("three.js"));
        assert!(!is_multi_token("kubernetes"));
        assert!(!is_multi_token("cplusplus"));
    }

    #[test]
    fn test_technical_categories_exist_in_table() {
        let table = SkillTable::standard();
        for category in TECHNICAL_CATEGORIES.iter().chain(ANALYZED_CATEGORIES) {
            assert!(
                table.skills_in_category(category).is_some(),
                "{category} not in table"
            );
        }
    }
}
