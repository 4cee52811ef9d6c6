//! Keyword-triggered bucketing of extracted CV text into coarse sections.
//!
//! This is a heuristic: a line mentioning a section keyword switches the
//! current section, and nothing checks that the keyword really was a header.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Education,
    Experience,
    Projects,
    Skills,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CvSections {
    pub education: Vec<String>,
    pub experience: Vec<String>,
    pub projects: Vec<String>,
    pub skills: Vec<String>,
}

impl CvSections {
    pub fn from_text(text: &str) -> Self {
        let mut sections = CvSections::default();
        let mut current: Option<Section> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = detect_header(line) {
                current = Some(header);
                continue;
            }

            let bucket = match current {
                Some(Section::Education) => &mut sections.education,
                Some(Section::Experience) => &mut sections.experience,
                Some(Section::Projects) => &mut sections.projects,
                Some(Section::Skills) => &mut sections.skills,
                None => continue,
            };
            bucket.push(line.to_string());
        }

        sections
    }

    pub fn line_count(&self) -> usize {
        self.education.len() + self.experience.len() + self.projects.len() + self.skills.len()
    }
}

fn detect_header(line: &str) -> Option<Section> {
    let lower = line.to_lowercase();
    if lower.contains("education") {
        Some(Section::Education)
    } else if lower.contains("experience") || lower.contains("work history") {
        Some(Section::Experience)
    } else if lower.contains("projects") {
        Some(Section::Projects)
    } else if lower.contains("skills") {
        Some(Section::Skills)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_follow_most_recent_header() {
        let text = "Jane Doe\nEDUCATION\nBSc Computer Science\n\nWork History\nAcme Corp\n  Built things  \nProjects\nresume-api\nTechnical Skills\nRust\nSQL";
        let sections = CvSections::from_text(text);

        assert_eq!(sections.education, vec!["BSc Computer Science"]);
        assert_eq!(sections.experience, vec!["Acme Corp", "Built things"]);
        assert_eq!(sections.projects, vec!["resume-api"]);
        assert_eq!(sections.skills, vec!["Rust", "SQL"]);
        assert_eq!(sections.line_count(), 6);
    }

    #[test]
    fn test_lines_before_any_header_are_dropped() {
        let sections = CvSections::from_text("Jane Doe\njane@example.com");
        assert_eq!(sections, CvSections::default());
    }

    #[test]
    fn test_keyword_inside_sentence_switches_section() {
        // No header validation: a bullet mentioning "experience" is read as a header.
        let text = "Skills\nRust\n5 years of experience with Kafka\nPostgres";
        let sections = CvSections::from_text(text);
        assert_eq!(sections.skills, vec!["Rust"]);
        assert_eq!(sections.experience, vec!["Postgres"]);
    }
}
