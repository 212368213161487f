//! Static knowledge about the university, used when no live data applies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic groups, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Programs,
    Facilities,
    Admission,
    Fees,
    Events,
    Faculty,
    Placement,
    Hostel,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Programs,
        Topic::Facilities,
        Topic::Admission,
        Topic::Fees,
        Topic::Events,
        Topic::Faculty,
        Topic::Placement,
        Topic::Hostel,
    ];

    /// Substrings that select this topic
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Topic::Programs => &["course", "program", "schedule"],
            Topic::Facilities => &["facility", "facilities", "infrastructure"],
            Topic::Admission => &["admission"],
            Topic::Fees => &["fee", "payment"],
            Topic::Events => &["event", "events"],
            Topic::Faculty => &["faculty", "professor", "teacher"],
            Topic::Placement => &["placement", "job", "career"],
            Topic::Hostel => &["hostel", "accommodation"],
        }
    }

    pub fn answer(self) -> &'static str {
        match self {
            Topic::Programs => "REVA University offers various programs across faculties like Engineering, Management, Commerce, Arts & Humanities, Science, and Law. Undergraduate courses include B.Tech, BBA, BCA, while postgraduate courses include M.Tech, MBA, MCA. The academic schedule typically runs from August to May with two semesters per year. For detailed schedules, students can check the academic calendar on the university portal.",
            Topic::Facilities => "REVA University provides state-of-the-art facilities including modern classrooms, research labs, library with e-resources, sports complex with indoor and outdoor facilities, health center, hostels, cafeteria, auditorium, and Wi-Fi across campus. The campus is eco-friendly with solar power and rainwater harvesting.",
            Topic::Admission => "For admission to REVA University, students need to apply online through the university website. Undergraduate admissions are based on entrance exams like KCET, COMEDK, JEE, or the university's own entrance test. Postgraduate admissions consider graduation marks and entrance scores. International students can apply through the International Student Cell. The admission season typically begins in February-March each year.",
            Topic::Fees => "Fee structures at REVA University vary by program. Engineering programs cost approximately ₹1.5-2.5 lakhs per year, Management programs around ₹3-5 lakhs, and Arts & Science programs around ₹60,000-1.5 lakhs annually. Various scholarships are available based on merit, sports excellence, and financial need. Fees can be paid online through the student portal or at the finance office.",
            Topic::Events => "REVA University hosts numerous events throughout the academic year including the annual cultural fest \"Revamp\", technical symposium \"TechReva\", sports meet \"Sportika\", and research conference \"RICE\". There are also regular workshops, guest lectures, industry visits, and department-specific events. The event calendar is regularly updated on the university website and notice boards.",
            Topic::Faculty => "REVA University has highly qualified faculty members with diverse academic backgrounds and industry experience. Many hold PhDs from prestigious institutions and actively engage in research. The faculty-student ratio is maintained at optimal levels to ensure quality education and personal attention. Faculty members regularly publish in international journals and present at conferences.",
            Topic::Placement => "The Career Development Center at REVA University facilitates placements with top companies across sectors. Recent placement records show 85-90% placement rates for eligible students, with average package of ₹5-7 lakhs per annum. Companies like Infosys, Wipro, TCS, Amazon, and many others regularly recruit from campus. Pre-placement training including mock interviews and resume building is provided to all students.",
            Topic::Hostel => "REVA University provides separate hostel facilities for boys and girls with furnished rooms, mess facility, Wi-Fi, and 24/7 security. Rooms are available in different configurations including single, double and triple sharing. The hostels have recreation areas, laundry services, and regular maintenance. Applications for hostel accommodation can be submitted during the admission process.",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::Programs => "programs",
            Topic::Facilities => "facilities",
            Topic::Admission => "admission",
            Topic::Fees => "fees",
            Topic::Events => "events",
            Topic::Faculty => "faculty",
            Topic::Placement => "placement",
            Topic::Hostel => "hostel",
        };
        f.write_str(name)
    }
}

/// First topic, in priority order, with a keyword contained in the query
pub fn match_topic(query: &str) -> Option<Topic> {
    let lower = query.to_lowercase();
    Topic::ALL
        .into_iter()
        .find(|topic| topic.keywords().iter().any(|keyword| lower.contains(keyword)))
}

/// Canned answer for the query's topic, or a pointer to the university's contact details
pub fn resolve_static(query: &str) -> String {
    match match_topic(query) {
        Some(topic) => topic.answer().to_string(),
        None => format!(
            "Based on your question about \"{}\", I recommend checking the REVA University website (www.reva.edu.in) for the most accurate and up-to-date information. You can also contact the university directly at +91-80-6622-6622 or info@reva.edu.in for specific details.",
            query
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_decides_overlaps() {
        assert_eq!(match_topic("What is the fee for BTech?"), Some(Topic::Fees));
        assert_eq!(match_topic("admission fee"), Some(Topic::Admission));
        assert_eq!(match_topic("program fee"), Some(Topic::Programs));
        assert_eq!(match_topic("Do professors help with career advice?"), Some(Topic::Faculty));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert_eq!(match_topic("HOSTEL rooms"), Some(Topic::Hostel));
        assert_eq!(match_topic("Coursework load"), Some(Topic::Programs));
        assert_eq!(match_topic("jobs after graduation"), Some(Topic::Placement));
    }

    #[test]
    fn unmatched_queries_get_contact_details() {
        assert_eq!(match_topic("Where is the library?"), None);

        let answer = resolve_static("Where is the library?");
        assert!(answer.starts_with("Based on your question about \"Where is the library?\""));
        assert!(answer.contains("www.reva.edu.in"));
        assert!(answer.contains("+91-80-6622-6622"));
        assert!(answer.contains("info@reva.edu.in"));
    }

    #[test]
    fn topic_answers_are_returned_verbatim() {
        assert_eq!(resolve_static("fees?"), Topic::Fees.answer());
        assert!(resolve_static("courses").contains("B.Tech, BBA, BCA"));
    }
}
