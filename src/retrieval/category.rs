//! Topic and analytics category enums with their keyword sets.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Knowledge base topic used to select evidence sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Admissions,
    Academics,
    Facilities,
    Events,
    People,
    Programs,
}

impl Topic {
    /// All topics, in evidence-rendering order.
    pub const ALL: [Topic; 6] = [
        Topic::People,
        Topic::Facilities,
        Topic::Events,
        Topic::Admissions,
        Topic::Programs,
        Topic::Academics,
    ];

    /// Keywords whose presence in a question selects this topic.
    #[must_use]
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Topic::Admissions => &[
                "admission",
                "admissions",
                "enroll",
                "enrollment",
                "apply",
                "application",
                "entry",
                "exam",
                "requirement",
                "requirements",
                "registration",
                "register",
            ],
            Topic::Academics => &[
                "academic",
                "academics",
                "curriculum",
                "grade",
                "grades",
                "subject",
                "subjects",
                "class",
                "classes",
                "department",
            ],
            Topic::Facilities => &[
                "facility",
                "facilities",
                "building",
                "buildings",
                "library",
                "lab",
                "labs",
                "gym",
                "gymnasium",
                "classroom",
                "classrooms",
                "office",
                "campus",
                "room",
                "rooms",
                "location",
                "locations",
            ],
            Topic::Events => &[
                "event",
                "events",
                "upcoming",
                "schedule",
                "schedules",
                "activity",
                "activities",
                "competition",
                "competitions",
                "happening",
                "held",
                "organized",
            ],
            Topic::People => &[
                "professor",
                "professors",
                "faculty",
                "staff",
                "teacher",
                "teachers",
                "instructor",
                "dean",
                "director",
                "president",
                "head",
            ],
            Topic::Programs => &[
                "program",
                "programs",
                "course",
                "courses",
                "offer",
                "offers",
                "provide",
                "provides",
                "available",
                "study",
                "studies",
                "major",
                "majors",
                "degree",
                "degrees",
                "scholarship",
                "scholarships",
                "tuition",
                "financial",
                "fee",
                "fees",
            ],
        }
    }

    /// Check whether any of this topic's keywords appear in the question.
    #[must_use]
    pub fn matches(self, lower_question: &str) -> bool {
        self.keywords()
            .iter()
            .any(|keyword| lower_question.contains(keyword))
    }

    /// All topics whose keywords appear in the question.
    #[must_use]
    pub fn matching(lower_question: &str) -> Vec<Topic> {
        Topic::ALL
            .into_iter()
            .filter(|topic| topic.matches(lower_question))
            .collect()
    }
}

/// Analytics label assigned to a completed query.
///
/// Classification never feeds back into retrieval; it only tags Query rows
/// and analytics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Admissions,
    Academic,
    Faculty,
    Campus,
    Scholarships,
    Events,
    General,
}

struct CategoryRule {
    category: QueryCategory,
    pattern: &'static Regex,
}

macro_rules! category_regex {
    ($name:ident, $pattern:literal) => {
        fn $name() -> &'static Regex {
            static PATTERN: OnceLock<Regex> = OnceLock::new();
            PATTERN.get_or_init(|| Regex::new($pattern).expect("category pattern is valid"))
        }
    };
}

category_regex!(admissions_re, r"admissions?|apply|enroll|requirements?|how to join");
category_regex!(academic_re, r"program|course|degree|study|curriculum|major");
category_regex!(faculty_re, r"professor|teacher|faculty|staff|instructor|dean|who teaches");
category_regex!(
    campus_re,
    r"campus|facilities|facility|building|library|lab|location|room|classroom|gym"
);
category_regex!(scholarships_re, r"scholarship|financial|aid|grant|discount");
category_regex!(
    events_re,
    r"event|activity|activities|upcoming|schedule|competition|sport|tournament|concert|meeting|conference|workshop|seminar|fair|celebration|gathering"
);

impl QueryCategory {
    /// Classify a question into a fixed analytics label; rules are checked in
    /// priority order and the first hit wins.
    #[must_use]
    pub fn classify(question: &str) -> Self {
        let lower = question.to_lowercase();
        let rules = [
            CategoryRule {
                category: QueryCategory::Admissions,
                pattern: admissions_re(),
            },
            CategoryRule {
                category: QueryCategory::Academic,
                pattern: academic_re(),
            },
            CategoryRule {
                category: QueryCategory::Faculty,
                pattern: faculty_re(),
            },
            CategoryRule {
                category: QueryCategory::Campus,
                pattern: campus_re(),
            },
            CategoryRule {
                category: QueryCategory::Scholarships,
                pattern: scholarships_re(),
            },
            CategoryRule {
                category: QueryCategory::Events,
                pattern: events_re(),
            },
        ];
        rules
            .into_iter()
            .find(|rule| rule.pattern.is_match(&lower))
            .map_or(QueryCategory::General, |rule| rule.category)
    }

    /// Stable string label for persistence and wire payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryCategory::Admissions => "admissions",
            QueryCategory::Academic => "academic",
            QueryCategory::Faculty => "faculty",
            QueryCategory::Campus => "campus",
            QueryCategory::Scholarships => "scholarships",
            QueryCategory::Events => "events",
            QueryCategory::General => "general",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_matching_single() {
        let topics = Topic::matching("who is the dean of engineering");
        assert_eq!(topics, vec![Topic::People]);
    }

    #[test]
    fn test_topic_matching_multiple() {
        let topics = Topic::matching("what events happen at the library");
        assert!(topics.contains(&Topic::Facilities));
        assert!(topics.contains(&Topic::Events));
    }

    #[test]
    fn test_topic_matching_none() {
        assert!(Topic::matching("zzxcvqq").is_empty());
    }

    #[test]
    fn test_classify_admissions() {
        assert_eq!(
            QueryCategory::classify("How do I apply?"),
            QueryCategory::Admissions
        );
    }

    #[test]
    fn test_classify_faculty() {
        assert_eq!(
            QueryCategory::classify("who teaches chemistry?"),
            QueryCategory::Faculty
        );
    }

    #[test]
    fn test_classify_campus() {
        assert_eq!(
            QueryCategory::classify("where is the library located"),
            QueryCategory::Campus
        );
    }

    #[test]
    fn test_classify_general_fallback() {
        assert_eq!(QueryCategory::classify("zzxcvqq"), QueryCategory::General);
    }

    #[test]
    fn test_classify_first_rule_wins() {
        // Mentions both admissions and programs; admissions is checked first
        assert_eq!(
            QueryCategory::classify("how do I apply to the nursing program"),
            QueryCategory::Admissions
        );
    }

    #[test]
    fn test_category_as_str() {
        assert_eq!(QueryCategory::Scholarships.as_str(), "scholarships");
        assert_eq!(QueryCategory::General.as_str(), "general");
    }
}
