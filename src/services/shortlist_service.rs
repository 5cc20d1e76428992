/// Resume scoring collaborator. The production deployment points this at an
/// external scoring engine; the built-in implementation is a keyword/criteria
/// match against the drive's role and skill list.
pub trait ResumeScorer: Send + Sync {
    /// Returns a 0-100 score and the shortlist decision.
    fn score(&self, resume: &str, role: &str, skills: &[String]) -> (i32, bool);
}

pub struct KeywordScorer {
    threshold: i32,
}

impl KeywordScorer {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ResumeScorer for KeywordScorer {
    fn score(&self, resume: &str, role: &str, skills: &[String]) -> (i32, bool) {
        let haystack = resume.to_lowercase();

        let mut keywords: Vec<String> = skills.iter().map(|s| s.trim().to_lowercase()).collect();
        for token in role.split_whitespace() {
            let token = token.trim().to_lowercase();
            if token.len() > 2 {
                keywords.push(token);
            }
        }
        keywords.retain(|k| !k.is_empty());
        keywords.dedup();

        if keywords.is_empty() {
            return (0, false);
        }

        let hits = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
        let score = (hits * 100 / keywords.len()) as i32;
        (score, score >= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_resume_is_shortlisted() {
        let scorer = KeywordScorer::default();
        let skills = vec!["rust".to_string(), "sql".to_string()];
        let (score, shortlisted) = scorer.score(
            "Five years of Rust backend work, heavy SQL and systems engineering.",
            "Backend Engineer",
            &skills,
        );
        assert!(score >= 50);
        assert!(shortlisted);
    }

    #[test]
    fn unrelated_resume_is_rejected() {
        let scorer = KeywordScorer::default();
        let skills = vec!["rust".to_string(), "sql".to_string(), "kafka".to_string()];
        let (score, shortlisted) = scorer.score(
            "Pastry chef with a passion for sourdough.",
            "Backend Engineer",
            &skills,
        );
        assert!(score < 50);
        assert!(!shortlisted);
    }

    #[test]
    fn empty_keyword_set_never_shortlists() {
        let scorer = KeywordScorer::default();
        let (score, shortlisted) = scorer.score("anything", "", &[]);
        assert_eq!(score, 0);
        assert!(!shortlisted);
    }
}
