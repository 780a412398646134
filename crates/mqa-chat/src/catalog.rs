//! Static answer catalog.
//!
//! Maps each category and APEL sub-category to its ordered canned questions
//! and their stored answers, plus display metadata (names, image keys).
//! Lookup is exact, case-sensitive string match; there is no fuzzy matching.

use std::collections::{HashMap, HashSet};

use crate::error::CatalogError;

/// Display name used for ids the catalog does not know.
pub const UNKNOWN_TOPIC_NAME: &str = "this topic";

/// Image shown when no category (or an unknown one) is selected.
pub const DEFAULT_IMAGE: &str = "mqa-logo.png";

// =============================================================================
// Types
// =============================================================================

/// A top-level inquiry topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image: String,
    pub questions: Vec<String>,
    pub has_sub_categories: bool,
}

/// A subdivision of a category (only APEL has these).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCategory {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub questions: Vec<String>,
}

/// Either kind of selectable topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic<'a> {
    Category(&'a Category),
    SubCategory(&'a SubCategory),
}

impl<'a> Topic<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Topic::Category(c) => &c.id,
            Topic::SubCategory(s) => &s.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Topic::Category(c) => &c.name,
            Topic::SubCategory(s) => &s.name,
        }
    }

    pub fn questions(&self) -> &'a [String] {
        match self {
            Topic::Category(c) => &c.questions,
            Topic::SubCategory(s) => &s.questions,
        }
    }
}

// =============================================================================
// AnswerCatalog
// =============================================================================

/// Immutable registry of categories, sub-categories and canned answers.
#[derive(Debug, Clone, Default)]
pub struct AnswerCatalog {
    categories: Vec<Category>,
    sub_categories: Vec<SubCategory>,
    answers: HashMap<String, HashMap<String, String>>,
}

impl AnswerCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with the widget.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (id, name, image, entries) in CATEGORIES {
            catalog.add_category(id, name, image, entries);
        }
        for (id, name, parent, entries) in APEL_SUB_CATEGORIES {
            catalog.add_sub_category(id, name, parent, entries);
        }
        catalog
    }

    /// Register a category with its ordered `(question, answer)` pairs.
    pub fn add_category(&mut self, id: &str, name: &str, image: &str, entries: &[(&str, &str)]) {
        self.categories.push(Category {
            id: id.to_string(),
            name: name.to_string(),
            image: image.to_string(),
            questions: entries.iter().map(|(q, _)| q.to_string()).collect(),
            has_sub_categories: false,
        });
        self.insert_answers(id, entries);
    }

    /// Register a sub-category under `parent`.
    ///
    /// A missing parent is not rejected here; [`AnswerCatalog::validate`]
    /// reports it.
    pub fn add_sub_category(&mut self, id: &str, name: &str, parent: &str, entries: &[(&str, &str)]) {
        if let Some(cat) = self.categories.iter_mut().find(|c| c.id == parent) {
            cat.has_sub_categories = true;
        }
        self.sub_categories.push(SubCategory {
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
            questions: entries.iter().map(|(q, _)| q.to_string()).collect(),
        });
        self.insert_answers(id, entries);
    }

    fn insert_answers(&mut self, id: &str, entries: &[(&str, &str)]) {
        let map = self.answers.entry(id.to_string()).or_default();
        for (q, a) in entries {
            map.insert(q.to_string(), a.to_string());
        }
    }

    /// Check referential integrity: unique ids, every sub-category has an
    /// existing parent, every listed question has a stored answer.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for id in self
            .categories
            .iter()
            .map(|c| &c.id)
            .chain(self.sub_categories.iter().map(|s| &s.id))
        {
            if !seen.insert(id.as_str()) {
                return Err(CatalogError::DuplicateId(id.clone()));
            }
        }

        for sub in &self.sub_categories {
            if self.category(&sub.parent).is_none() {
                return Err(CatalogError::UnknownParent {
                    sub: sub.id.clone(),
                    parent: sub.parent.clone(),
                });
            }
        }

        for topic in self.topics() {
            for question in topic.questions() {
                if self.lookup(topic.id(), question).is_none() {
                    return Err(CatalogError::MissingAnswer {
                        topic: topic.id().to_string(),
                        question: question.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Stored answer for `question` under `topic_id`, if any.
    pub fn lookup(&self, topic_id: &str, question: &str) -> Option<&str> {
        self.answers
            .get(topic_id)
            .and_then(|m| m.get(question))
            .map(String::as_str)
    }

    /// Ordered canned questions for a category or sub-category.
    pub fn questions_for(&self, topic_id: &str) -> &[String] {
        self.topic(topic_id).map(|t| t.questions()).unwrap_or(&[])
    }

    /// Display name, or `"this topic"` for unknown ids.
    pub fn display_name(&self, topic_id: &str) -> &str {
        self.topic(topic_id)
            .map(|t| t.name())
            .unwrap_or(UNKNOWN_TOPIC_NAME)
    }

    /// Image key for the selection. Sub-categories show their parent's image;
    /// `None` and unknown ids show the generic image.
    pub fn image_key(&self, topic_id: Option<&str>) -> &str {
        let Some(id) = topic_id else {
            return DEFAULT_IMAGE;
        };
        let category_id = self.parent_of(id).unwrap_or(id);
        self.category(category_id)
            .map(|c| c.image.as_str())
            .unwrap_or(DEFAULT_IMAGE)
    }

    /// Top-level categories in display order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn sub_category(&self, id: &str) -> Option<&SubCategory> {
        self.sub_categories.iter().find(|s| s.id == id)
    }

    /// Sub-categories of `parent` in display order.
    pub fn sub_categories_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a SubCategory> + 'a {
        self.sub_categories.iter().filter(move |s| s.parent == parent)
    }

    pub fn topic(&self, id: &str) -> Option<Topic<'_>> {
        self.category(id)
            .map(Topic::Category)
            .or_else(|| self.sub_category(id).map(Topic::SubCategory))
    }

    pub fn is_sub_category(&self, id: &str) -> bool {
        self.sub_category(id).is_some()
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.sub_category(id).map(|s| s.parent.as_str())
    }

    fn topics(&self) -> impl Iterator<Item = Topic<'_>> {
        self.categories
            .iter()
            .map(Topic::Category)
            .chain(self.sub_categories.iter().map(Topic::SubCategory))
    }
}

// =============================================================================
// Built-in content
// =============================================================================

type Entries = &'static [(&'static str, &'static str)];

const CATEGORIES: [(&str, &str, &str, Entries); 7] = [
    ("accreditation", "Accreditation Process & Status", "accreditation.png", &[
        ("What is the accreditation process timeline?", "The accreditation process typically takes 6-9 months from application submission to final decision. This includes document review, site visits, and committee evaluation."),
        ("What documents are required for accreditation?", "Required documents include: institutional profile, program specifications, quality assurance documents, faculty qualifications, facility details, and financial sustainability reports."),
        ("How to check accreditation status?", "You can check accreditation status through the MQA portal at portal.mqa.gov.my or contact our accreditation division directly at accreditation@mqa.gov.my"),
        ("What are the accreditation fees?", "Accreditation fees vary based on program level and institution type. Basic fees start from RM 5,000 for certificate programs to RM 15,000 for doctoral programs."),
        ("How to appeal an accreditation decision?", "Appeals must be submitted within 30 days of decision notification. Submit a formal appeal letter with supporting documents to appeals@mqa.gov.my"),
    ]),
    ("framework", "MQA Framework", "framework.png", &[
        ("What is the Malaysian Qualifications Framework (MQF)?", "The MQF is a unified national qualifications framework that organizes qualifications according to a set of criteria based on learning outcomes."),
        ("How does the MQF work?", "The MQF functions as a reference point for qualifications, ensuring quality and facilitating credit transfer and recognition across education sectors."),
        ("What are the MQF levels?", "The MQF has 8 levels from Level 1 (Certificate) to Level 8 (Doctoral), with each level specifying learning outcomes and credit requirements."),
        ("Where can I find the latest MQA policies?", "Latest policies are available on the official MQA website at www.mqa.gov.my/policies or through the MQA digital library."),
        ("How often are framework standards updated?", "Framework standards are reviewed every 3-5 years to ensure relevance with industry needs and international best practices."),
    ]),
    ("qualifications", "Qualification Standards", "qualifications.png", &[
        ("What are the standards for new programs?", "New programs must meet MQF level descriptors, have adequate resources, qualified faculty, and align with national education goals."),
        ("How to develop a new qualification?", "Follow the MQA program development guidelines, conduct needs analysis, design curriculum based on learning outcomes, and submit proposal through the online system."),
        ("What are the program standards requirements?", "Requirements include: clear learning outcomes, appropriate assessment methods, qualified teaching staff, adequate facilities, and quality assurance mechanisms."),
        ("How to modify an existing qualification?", "Submit modification proposal through MQA portal, providing justification and impact analysis. Major changes may require re-accreditation."),
        ("Where can I find the qualification standards handbook?", "The handbook is available for download at www.mqa.gov.my/standards-handbook"),
    ]),
    ("recognition", "Recognition of Qualification", "recognition.png", &[
        ("How to get a qualification recognized?", "Submit application through MQA recognition portal with complete academic transcripts, certificate copies, and program details."),
        ("What is the recognition process?", "Process includes document verification, qualification assessment against MQF, committee review, and issuance of recognition certificate."),
        ("Which qualifications need recognition?", "All foreign qualifications and local qualifications from non-accredited institutions require MQA recognition for official purposes."),
        ("How long does recognition take?", "Standard processing time is 2-3 months for complete applications. Complex cases may take longer."),
        ("What documents are needed for recognition?", "Required: academic transcripts, certificates, program specifications, institution details, and identification documents."),
    ]),
    ("equivalency", "Equivalency of Qualification", "equivalency.png", &[
        ("What is qualification equivalency?", "Equivalency establishes the comparable MQF level for qualifications obtained from different education systems."),
        ("How to apply for equivalency?", "Apply through MQA equivalency portal with complete academic documents and pay the assessment fee."),
        ("Which countries' qualifications are recognized?", "MQA recognizes qualifications from countries with established quality assurance systems and mutual recognition agreements."),
        ("What is the equivalency assessment process?", "Assessment compares learning outcomes, program duration, content, and assessment methods against MQF standards."),
        ("How long does equivalency assessment take?", "Standard assessment takes 4-6 weeks. Additional verification may extend this period."),
    ]),
    ("apel", "APEL", "apel.png", &[
        ("What is APEL?", "APEL (Accreditation of Prior Experiential Learning) recognizes skills and knowledge gained through work and life experiences."),
        ("Who can apply for APEL?", "Malaysian citizens aged 21+ with relevant work experience can apply for APEL assessment for entry to programs or credit transfer."),
        ("How does APEL work?", "Candidates document their learning experiences, submit portfolio for assessment, and may undergo interviews or practical tests."),
        ("What are the APEL requirements?", "Minimum 3 years relevant experience, portfolio evidence, and meeting specific program entry requirements."),
        ("How to apply for APEL assessment?", "Register through APEL online system, prepare learning portfolio, and submit for assessment with required fees."),
    ]),
    ("faq", "Frequently Asked Questions", "faq.png", &[
        ("How to contact MQA directly?", "Call 03-7968 7002, email enquiry@mqa.gov.my, or visit MQA headquarters at Menara MQA, Cyberjaya."),
        ("Where is MQA headquarters located?", "MQA Headquarters: Malaysian Qualifications Agency, Menara MQA, Lingkaran Cyber Point Timur, 63000 Cyberjaya, Selangor."),
        ("What are MQA's operating hours?", "Monday-Friday: 8:00 AM - 5:00 PM. Closed on weekends and public holidays."),
        ("How to file a complaint?", "Submit complaints through MQA portal, email complaint@mqa.gov.my, or call the complaints hotline at 03-7968 7029."),
        ("Where can I download official forms?", "All official forms available at www.mqa.gov.my/forms or through the MQA digital services portal."),
    ]),
];

const APEL_SUB_CATEGORIES: [(&str, &str, &str, Entries); 4] = [
    ("apel-a", "APEL.A - Access to Higher Education", "apel", &[
        ("What is APEL.A?", "APEL.A (Access) allows individuals with work experience to enter higher education programs without formal academic qualifications."),
        ("Who is eligible for APEL.A?", "Malaysian citizens aged 21+ with minimum 3 years relevant work experience in the field of study."),
        ("How to apply for APEL.A?", "Apply through the APEL online portal, submit portfolio of experiential learning, and attend assessment interview."),
        ("What documents are needed for APEL.A?", "Required: Identification documents, work experience evidence, portfolio, and application form."),
        ("What is the APEL.A assessment process?", "Assessment includes portfolio review, interview, and sometimes practical tests to verify learning outcomes."),
    ]),
    ("apel-c", "APEL.C - Credit Transfer", "apel", &[
        ("What is APEL.C?", "APEL.C (Credit Transfer) allows recognition of prior learning for credit exemption in academic programs."),
        ("How many credits can I get through APEL.C?", "Maximum 50% of total program credits can be obtained through APEL.C, subject to institutional policies."),
        ("What types of learning qualify for APEL.C?", "Work experience, professional training, online courses, and other verifiable learning experiences."),
        ("How to apply for APEL.C credit transfer?", "Submit application through participating institutions with evidence of prior learning."),
        ("What is the cost of APEL.C assessment?", "Assessment fees vary by institution, typically ranging from RM 200-500 per credit hour."),
    ]),
    ("apel-q", "APEL.Q - Qualifications", "apel", &[
        ("What is APEL.Q?", "APEL.Q (Qualifications) provides formal recognition of experiential learning leading to full qualifications."),
        ("What qualifications are available through APEL.Q?", "Certificate, Diploma, and Advanced Diploma levels in various fields."),
        ("How long does APEL.Q assessment take?", "Complete assessment process typically takes 3-6 months depending on qualification level."),
        ("What are the APEL.Q requirements?", "Minimum 5 years relevant experience, comprehensive portfolio, and successful assessment."),
        ("Are APEL.Q qualifications recognized?", "Yes, APEL.Q qualifications are recognized under the Malaysian Qualifications Framework."),
    ]),
    ("apel-m", "APEL.M - Micro-credentials", "apel", &[
        ("What is APEL.M?", "APEL.M (Micro-credentials) recognizes specific skills and competencies through short, focused learning programs."),
        ("What types of micro-credentials are available?", "Digital skills, technical competencies, professional development, and industry-specific skills."),
        ("How long do APEL.M programs take?", "Typically 2-6 months depending on the complexity of skills being assessed."),
        ("Are APEL.M credentials stackable?", "Yes, multiple micro-credentials can be combined toward larger qualifications."),
        ("How to register for APEL.M?", "Register through approved training providers or the MQA APEL portal."),
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Built-in registry ----

    #[test]
    fn test_builtin_catalog_is_valid() {
        assert_eq!(AnswerCatalog::builtin().validate(), Ok(()));
    }

    #[test]
    fn test_builtin_category_order() {
        let catalog = AnswerCatalog::builtin();
        let ids: Vec<&str> = catalog.categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["accreditation", "framework", "qualifications", "recognition", "equivalency", "apel", "faq"]
        );
    }

    #[test]
    fn test_only_apel_has_sub_categories() {
        let catalog = AnswerCatalog::builtin();
        for cat in catalog.categories() {
            assert_eq!(cat.has_sub_categories, cat.id == "apel", "{}", cat.id);
        }
        let subs: Vec<&str> = catalog.sub_categories_of("apel").map(|s| s.name.as_str()).collect();
        assert_eq!(
            subs,
            vec![
                "APEL.A - Access to Higher Education",
                "APEL.C - Credit Transfer",
                "APEL.Q - Qualifications",
                "APEL.M - Micro-credentials",
            ]
        );
    }

    #[test]
    fn test_every_canned_question_resolves_to_stored_answer() {
        let catalog = AnswerCatalog::builtin();
        let tables = CATEGORIES
            .iter()
            .map(|(id, _, _, e)| (*id, *e))
            .chain(APEL_SUB_CATEGORIES.iter().map(|(id, _, _, e)| (*id, *e)));
        for (id, entries) in tables {
            assert_eq!(catalog.questions_for(id).len(), entries.len());
            for (question, answer) in entries {
                assert_eq!(catalog.lookup(id, question), Some(*answer), "{id}: {question}");
            }
        }
    }

    // ---- Lookup ----

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let catalog = AnswerCatalog::builtin();
        assert!(catalog.lookup("faq", "How to contact MQA directly?").is_some());
        assert!(catalog.lookup("faq", "how to contact MQA directly?").is_none());
        assert!(catalog.lookup("faq", "How to contact MQA directly").is_none());
        assert!(catalog.lookup("faq", " How to contact MQA directly?").is_none());
    }

    #[test]
    fn test_lookup_wrong_topic_misses() {
        let catalog = AnswerCatalog::builtin();
        assert!(catalog.lookup("apel", "What is APEL.A?").is_none());
        assert!(catalog.lookup("nope", "What is APEL?").is_none());
    }

    #[test]
    fn test_questions_for_unknown_is_empty() {
        assert!(AnswerCatalog::builtin().questions_for("astrology").is_empty());
    }

    // ---- Metadata ----

    #[test]
    fn test_display_name_defaults() {
        let catalog = AnswerCatalog::builtin();
        assert_eq!(catalog.display_name("faq"), "Frequently Asked Questions");
        assert_eq!(catalog.display_name("apel-c"), "APEL.C - Credit Transfer");
        assert_eq!(catalog.display_name("unknown"), "this topic");
    }

    #[test]
    fn test_image_key() {
        let catalog = AnswerCatalog::builtin();
        assert_eq!(catalog.image_key(Some("framework")), "framework.png");
        assert_eq!(catalog.image_key(Some("apel-q")), "apel.png");
        assert_eq!(catalog.image_key(Some("unknown")), DEFAULT_IMAGE);
        assert_eq!(catalog.image_key(None), DEFAULT_IMAGE);
    }

    #[test]
    fn test_topic_kinds() {
        let catalog = AnswerCatalog::builtin();
        assert!(matches!(catalog.topic("apel"), Some(Topic::Category(_))));
        assert!(matches!(catalog.topic("apel-m"), Some(Topic::SubCategory(_))));
        assert!(catalog.topic("apel-z").is_none());
        assert!(catalog.is_sub_category("apel-a"));
        assert!(!catalog.is_sub_category("apel"));
        assert_eq!(catalog.parent_of("apel-a"), Some("apel"));
        assert_eq!(catalog.parent_of("faq"), None);
    }

    // ---- Validation ----

    #[test]
    fn test_validate_rejects_dangling_parent() {
        let mut catalog = AnswerCatalog::new();
        catalog.add_category("faq", "FAQ", "faq.png", &[("Q?", "A.")]);
        catalog.add_sub_category("faq-x", "Orphan", "missing", &[]);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::UnknownParent {
                sub: "faq-x".to_string(),
                parent: "missing".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut catalog = AnswerCatalog::new();
        catalog.add_category("faq", "FAQ", "faq.png", &[]);
        catalog.add_category("faq", "FAQ again", "faq.png", &[]);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::DuplicateId("faq".to_string()))
        );
    }

    #[test]
    fn test_sub_category_sets_parent_flag() {
        let mut catalog = AnswerCatalog::new();
        catalog.add_category("root", "Root", "root.png", &[]);
        assert!(!catalog.category("root").unwrap().has_sub_categories);
        catalog.add_sub_category("root-a", "Leaf", "root", &[("Q?", "A.")]);
        assert!(catalog.category("root").unwrap().has_sub_categories);
        assert_eq!(catalog.validate(), Ok(()));
    }
}
