//! Built-in OLD schema.
//!
//! Entity, attribute and relation definitions for the searchable resources of
//! the Online Linguistic Database. Table and column names follow the OLD
//! relational layout (`form`, `formfile`, `syntacticcategory`, ...).
//!
//! `Memorizer` is an alias of `User`: it names the users who memorized a form
//! and exposes only their names and role.

use crate::error::RegistryError;

use super::registry::{EntityAlias, EntityDef, RelationDef, SchemaRegistry};
use super::types::ScalarType::{Boolean, Date, Datetime, Float, Integer, String as Text};

/// Builds the registry for the OLD data model.
pub fn old_schema() -> Result<SchemaRegistry, RegistryError> {
    SchemaRegistry::builder()
        .entities([
            form(),
            form_backup(),
            form_search(),
            translation(),
            file(),
            collection(),
            collection_backup(),
            tag(),
            user(),
            speaker(),
            source(),
            syntactic_category(),
            elicitation_method(),
            corpus(),
            corpus_backup(),
            language(),
            keyboard(),
            orthography(),
            phonology(),
            phonology_backup(),
            morphology(),
            morphology_backup(),
            morphological_parser(),
            morphological_parser_backup(),
            morpheme_language_model(),
            morpheme_language_model_backup(),
        ])
        .alias(
            EntityAlias::new("Memorizer", "User")
                .with_attributes(["id", "first_name", "last_name", "role"]),
        )
        .build()
}

fn with_text(mut entity: EntityDef, names: &[&str]) -> EntityDef {
    for name in names {
        entity = entity.with_attribute(*name, Text);
    }
    entity
}

/// `enterer` and `modifier`, the audit relations most resources carry.
fn with_audit_users(entity: EntityDef) -> EntityDef {
    entity
        .with_relation(RelationDef::to_one("enterer", "User", "enterer_id"))
        .with_relation(RelationDef::to_one("modifier", "User", "modifier_id"))
}

fn form() -> EntityDef {
    EntityDef::new("Form")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("transcription", Text)
        .with_attribute("phonetic_transcription", Text)
        .with_attribute("narrow_phonetic_transcription", Text)
        .with_attribute("morpheme_break", Text)
        .with_attribute("morpheme_gloss", Text)
        .with_attribute("comments", Text)
        .with_attribute("speaker_comments", Text)
        .with_attribute("grammaticality", Text)
        .with_attribute("date_elicited", Date)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("syntactic_category_string", Text)
        .with_attribute("morpheme_break_ids", Text)
        .with_attribute("morpheme_gloss_ids", Text)
        .with_attribute("break_gloss_category", Text)
        .with_attribute("syntax", Text)
        .with_attribute("semantics", Text)
        .with_attribute("status", Text)
        .with_relation(RelationDef::to_one("elicitor", "User", "elicitor_id"))
        .with_relation(RelationDef::to_one("enterer", "User", "enterer_id"))
        .with_relation(RelationDef::to_one("modifier", "User", "modifier_id"))
        .with_relation(RelationDef::to_one("verifier", "User", "verifier_id"))
        .with_relation(RelationDef::to_one("speaker", "Speaker", "speaker_id"))
        .with_relation(RelationDef::to_one(
            "elicitation_method",
            "ElicitationMethod",
            "elicitationmethod_id",
        ))
        .with_relation(RelationDef::to_one(
            "syntactic_category",
            "SyntacticCategory",
            "syntacticcategory_id",
        ))
        .with_relation(RelationDef::to_one("source", "Source", "source_id"))
        .with_relation(RelationDef::to_many("translations", "Translation", "form_id").as_default())
        .with_relation(
            RelationDef::many_to_many("files", "File", "formfile", "form_id", "file_id").as_default(),
        )
        .with_relation(
            RelationDef::many_to_many(
                "collections",
                "Collection",
                "collectionform",
                "form_id",
                "collection_id",
            )
            .as_default(),
        )
        .with_relation(
            RelationDef::many_to_many("tags", "Tag", "formtag", "form_id", "tag_id").as_default(),
        )
        .with_relation(
            RelationDef::many_to_many("memorizers", "User", "userform", "form_id", "user_id")
                .as_default_for("Memorizer"),
        )
        .with_relation(RelationDef::many_to_many(
            "corpora",
            "Corpus",
            "corpusform",
            "form_id",
            "corpus_id",
        ))
}

fn translation() -> EntityDef {
    EntityDef::new("Translation")
        .with_attribute("id", Integer)
        .with_attribute("transcription", Text)
        .with_attribute("grammaticality", Text)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::to_one("form", "Form", "form_id"))
}

fn file() -> EntityDef {
    EntityDef::new("File")
        .with_attribute("id", Integer)
        .with_attribute("filename", Text)
        .with_attribute("name", Text)
        .with_attribute("MIME_type", Text)
        .with_attribute("size", Integer)
        .with_attribute("description", Text)
        .with_attribute("date_elicited", Date)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("utterance_type", Text)
        .with_attribute("url", Text)
        .with_attribute("start", Float)
        .with_attribute("end", Float)
        .with_attribute("lossy_filename", Text)
        .with_relation(RelationDef::to_one("enterer", "User", "enterer_id"))
        .with_relation(RelationDef::to_one("elicitor", "User", "elicitor_id"))
        .with_relation(RelationDef::to_one("speaker", "Speaker", "speaker_id"))
        .with_relation(RelationDef::to_one("parent_file", "File", "parent_file_id"))
        .with_relation(
            RelationDef::many_to_many("tags", "Tag", "filetag", "file_id", "tag_id").as_default(),
        )
        .with_relation(
            RelationDef::many_to_many("forms", "Form", "formfile", "file_id", "form_id").as_default(),
        )
        .with_relation(
            RelationDef::many_to_many(
                "collections",
                "Collection",
                "collectionfile",
                "file_id",
                "collection_id",
            )
            .as_default(),
        )
}

fn collection() -> EntityDef {
    EntityDef::new("Collection")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("title", Text)
        .with_attribute("type", Text)
        .with_attribute("url", Text)
        .with_attribute("description", Text)
        .with_attribute("markup_language", Text)
        .with_attribute("contents", Text)
        .with_attribute("html", Text)
        .with_attribute("date_elicited", Date)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::to_one("speaker", "Speaker", "speaker_id"))
        .with_relation(RelationDef::to_one("source", "Source", "source_id"))
        .with_relation(RelationDef::to_one("elicitor", "User", "elicitor_id"))
        .with_relation(RelationDef::to_one("enterer", "User", "enterer_id"))
        .with_relation(RelationDef::to_one("modifier", "User", "modifier_id"))
        .with_relation(
            RelationDef::many_to_many("tags", "Tag", "collectiontag", "collection_id", "tag_id")
                .as_default(),
        )
        .with_relation(
            RelationDef::many_to_many(
                "forms",
                "Form",
                "collectionform",
                "collection_id",
                "form_id",
            )
            .as_default(),
        )
        .with_relation(
            RelationDef::many_to_many(
                "files",
                "File",
                "collectionfile",
                "collection_id",
                "file_id",
            )
            .as_default(),
        )
}

fn tag() -> EntityDef {
    EntityDef::new("Tag")
        .with_attribute("id", Integer)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::many_to_many(
            "forms", "Form", "formtag", "tag_id", "form_id",
        ))
        .with_relation(RelationDef::many_to_many(
            "files", "File", "filetag", "tag_id", "file_id",
        ))
}

fn user() -> EntityDef {
    // no password or salt
    EntityDef::new("User")
        .with_attribute("id", Integer)
        .with_attribute("username", Text)
        .with_attribute("first_name", Text)
        .with_attribute("last_name", Text)
        .with_attribute("email", Text)
        .with_attribute("affiliation", Text)
        .with_attribute("role", Text)
        .with_attribute("markup_language", Text)
        .with_attribute("page_content", Text)
        .with_attribute("html", Text)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::to_one(
            "input_orthography",
            "Orthography",
            "input_orthography_id",
        ))
        .with_relation(RelationDef::to_one(
            "output_orthography",
            "Orthography",
            "output_orthography_id",
        ))
        .with_relation(RelationDef::many_to_many(
            "remembered_forms",
            "Form",
            "userform",
            "user_id",
            "form_id",
        ))
}

fn speaker() -> EntityDef {
    EntityDef::new("Speaker")
        .with_attribute("id", Integer)
        .with_attribute("first_name", Text)
        .with_attribute("last_name", Text)
        .with_attribute("dialect", Text)
        .with_attribute("markup_language", Text)
        .with_attribute("page_content", Text)
        .with_attribute("html", Text)
        .with_attribute("datetime_modified", Datetime)
}

fn source() -> EntityDef {
    let source = EntityDef::new("Source")
        .with_attribute("id", Integer)
        .with_attribute("year", Integer)
        .with_attribute("datetime_modified", Datetime);
    with_text(source, &[
        "type",
        "key",
        "address",
        "annote",
        "author",
        "booktitle",
        "chapter",
        "crossref",
        "edition",
        "editor",
        "howpublished",
        "institution",
        "journal",
        "key_field",
        "month",
        "note",
        "number",
        "organization",
        "pages",
        "publisher",
        "school",
        "series",
        "title",
        "type_field",
        "url",
        "volume",
        "affiliation",
        "abstract",
        "contents",
        "copyright",
        "ISBN",
        "ISSN",
        "keywords",
        "language",
        "location",
        "LCCN",
        "mrnumber",
        "price",
        "size",
    ])
    .with_relation(RelationDef::to_one("file", "File", "file_id"))
    .with_relation(RelationDef::to_one(
        "crossref_source",
        "Source",
        "crossref_source_id",
    ))
}

fn syntactic_category() -> EntityDef {
    EntityDef::new("SyntacticCategory")
        .with_table("syntacticcategory")
        .with_attribute("id", Integer)
        .with_attribute("name", Text)
        .with_attribute("type", Text)
        .with_attribute("description", Text)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::to_many(
            "forms",
            "Form",
            "syntacticcategory_id",
        ))
}

fn elicitation_method() -> EntityDef {
    EntityDef::new("ElicitationMethod")
        .with_table("elicitationmethod")
        .with_attribute("id", Integer)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("datetime_modified", Datetime)
}

fn corpus() -> EntityDef {
    let corpus = EntityDef::new("Corpus")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("name", Text)
        .with_attribute("type", Text)
        .with_attribute("description", Text)
        .with_attribute("content", Text)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::to_one(
            "form_search",
            "FormSearch",
            "form_search_id",
        ));
    with_audit_users(corpus)
        .with_relation(RelationDef::many_to_many(
            "tags",
            "Tag",
            "corpustag",
            "corpus_id",
            "tag_id",
        ))
        .with_relation(RelationDef::many_to_many(
            "forms",
            "Form",
            "corpusform",
            "corpus_id",
            "form_id",
        ))
}

fn language() -> EntityDef {
    EntityDef::new("Language")
        .with_primary_key("Id")
        .with_attribute("Id", Text)
        .with_attribute("Part2B", Text)
        .with_attribute("Part2T", Text)
        .with_attribute("Part1", Text)
        .with_attribute("Scope", Text)
        .with_attribute("Type", Text)
        .with_attribute("Ref_Name", Text)
        .with_attribute("Comment", Text)
        .with_attribute("datetime_modified", Datetime)
}

fn form_search() -> EntityDef {
    EntityDef::new("FormSearch")
        .with_table("formsearch")
        .with_attribute("id", Integer)
        .with_attribute("name", Text)
        .with_attribute("search", Text)
        .with_attribute("description", Text)
        .with_attribute("datetime_modified", Datetime)
        .with_relation(RelationDef::to_one("enterer", "User", "enterer_id"))
}

fn keyboard() -> EntityDef {
    let keyboard = EntityDef::new("Keyboard")
        .with_attribute("id", Integer)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime);
    with_audit_users(keyboard)
}

fn orthography() -> EntityDef {
    EntityDef::new("Orthography")
        .with_attribute("id", Integer)
        .with_attribute("name", Text)
        .with_attribute("orthography", Text)
        .with_attribute("lowercase", Boolean)
        .with_attribute("initial_glottal_stops", Boolean)
        .with_attribute("datetime_modified", Datetime)
}

fn phonology() -> EntityDef {
    let phonology = EntityDef::new("Phonology")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("script", Text)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("datetime_compiled", Datetime)
        .with_attribute("compile_succeeded", Boolean)
        .with_attribute("compile_message", Text)
        .with_attribute("compile_attempt", Text);
    with_audit_users(phonology)
}

fn morphology() -> EntityDef {
    let morphology = EntityDef::new("Morphology")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("script_type", Text)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("compile_succeeded", Boolean)
        .with_attribute("compile_message", Text)
        .with_attribute("compile_attempt", Text)
        .with_attribute("generate_attempt", Text)
        .with_attribute("extract_morphemes_from_rules_corpus", Boolean)
        .with_attribute("rules", Text)
        .with_attribute("rules_generated", Text)
        .with_relation(RelationDef::to_one(
            "lexicon_corpus",
            "Corpus",
            "lexicon_corpus_id",
        ))
        .with_relation(RelationDef::to_one(
            "rules_corpus",
            "Corpus",
            "rules_corpus_id",
        ));
    with_audit_users(morphology)
}

fn morphological_parser() -> EntityDef {
    let parser = EntityDef::new("MorphologicalParser")
        .with_table("morphologicalparser")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("compile_succeeded", Boolean)
        .with_attribute("compile_message", Text)
        .with_attribute("compile_attempt", Text)
        .with_relation(RelationDef::to_one("phonology", "Phonology", "phonology_id"))
        .with_relation(RelationDef::to_one("morphology", "Morphology", "morphology_id"))
        .with_relation(RelationDef::to_one(
            "language_model",
            "MorphemeLanguageModel",
            "language_model_id",
        ));
    with_audit_users(parser)
}

fn morpheme_language_model() -> EntityDef {
    let model = EntityDef::new("MorphemeLanguageModel")
        .with_table("morphemelanguagemodel")
        .with_attribute("id", Integer)
        .with_attribute("UUID", Text)
        .with_attribute("name", Text)
        .with_attribute("description", Text)
        .with_attribute("smoothing", Text)
        .with_attribute("order", Integer)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("generate_succeeded", Boolean)
        .with_attribute("generate_message", Text)
        .with_attribute("generate_attempt", Text)
        .with_relation(RelationDef::to_one("corpus", "Corpus", "corpus_id"))
        .with_relation(RelationDef::to_one(
            "vocabulary_morphology",
            "Morphology",
            "vocabulary_morphology_id",
        ));
    with_audit_users(model)
}

// Backups snapshot a resource. Their relations are stored as serialized text
// and are searched as plain string attributes.

fn form_backup() -> EntityDef {
    let backup = EntityDef::new("FormBackup")
        .with_table("formbackup")
        .with_attribute("id", Integer)
        .with_attribute("form_id", Integer)
        .with_attribute("date_elicited", Date)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime);
    with_text(backup, &[
        "UUID",
        "transcription",
        "phonetic_transcription",
        "narrow_phonetic_transcription",
        "morpheme_break",
        "morpheme_gloss",
        "comments",
        "speaker_comments",
        "grammaticality",
        "syntactic_category_string",
        "morpheme_break_ids",
        "morpheme_gloss_ids",
        "break_gloss_category",
        "syntax",
        "semantics",
        "elicitor",
        "enterer",
        "verifier",
        "speaker",
        "elicitation_method",
        "syntactic_category",
        "source",
        "translations",
        "tags",
        "files",
        "collections",
    ])
}

fn collection_backup() -> EntityDef {
    let backup = EntityDef::new("CollectionBackup")
        .with_table("collectionbackup")
        .with_attribute("id", Integer)
        .with_attribute("collection_id", Integer)
        .with_attribute("date_elicited", Date)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime);
    with_text(backup, &[
        "UUID",
        "title",
        "type",
        "url",
        "description",
        "markup_language",
        "contents",
        "html",
        "speaker",
        "source",
        "elicitor",
        "enterer",
        "tags",
        "forms",
        "files",
    ])
}

fn corpus_backup() -> EntityDef {
    let backup = EntityDef::new("CorpusBackup")
        .with_table("corpusbackup")
        .with_attribute("id", Integer)
        .with_attribute("corpus_id", Integer)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime);
    with_text(backup, &[
        "UUID",
        "name",
        "type",
        "description",
        "content",
        "enterer",
        "modifier",
        "tags",
        "forms",
    ])
}

fn phonology_backup() -> EntityDef {
    let backup = EntityDef::new("PhonologyBackup")
        .with_table("phonologybackup")
        .with_attribute("id", Integer)
        .with_attribute("phonology_id", Integer)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("datetime_compiled", Datetime)
        .with_attribute("compile_succeeded", Boolean);
    with_text(backup, &[
        "UUID",
        "name",
        "description",
        "script",
        "enterer",
        "modifier",
        "compile_message",
        "compile_attempt",
    ])
}

fn morphology_backup() -> EntityDef {
    let backup = EntityDef::new("MorphologyBackup")
        .with_table("morphologybackup")
        .with_attribute("id", Integer)
        .with_attribute("morphology_id", Integer)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("compile_succeeded", Boolean)
        .with_attribute("extract_morphemes_from_rules_corpus", Boolean);
    with_text(backup, &[
        "UUID",
        "name",
        "description",
        "script_type",
        "enterer",
        "modifier",
        "lexicon_corpus",
        "rules_corpus",
        "compile_message",
        "compile_attempt",
        "generate_attempt",
        "rules",
    ])
}

fn morphological_parser_backup() -> EntityDef {
    let backup = EntityDef::new("MorphologicalParserBackup")
        .with_table("morphologicalparserbackup")
        .with_attribute("id", Integer)
        .with_attribute("morphologicalparser_id", Integer)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("compile_succeeded", Boolean);
    with_text(backup, &[
        "UUID",
        "name",
        "description",
        "phonology",
        "morphology",
        "language_model",
        "enterer",
        "modifier",
        "compile_message",
        "compile_attempt",
    ])
}

fn morpheme_language_model_backup() -> EntityDef {
    let backup = EntityDef::new("MorphemeLanguageModelBackup")
        .with_table("morphemelanguagemodelbackup")
        .with_attribute("id", Integer)
        .with_attribute("morphemelanguagemodel_id", Integer)
        .with_attribute("datetime_entered", Datetime)
        .with_attribute("datetime_modified", Datetime)
        .with_attribute("generate_succeeded", Boolean);
    with_text(backup, &[
        "UUID",
        "name",
        "description",
        "corpus",
        "enterer",
        "modifier",
        "generate_message",
        "generate_attempt",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cardinality, ScalarType};

    const OLD_ENTITIES: [&str; 26] = [
        "Collection",
        "CollectionBackup",
        "Corpus",
        "CorpusBackup",
        "ElicitationMethod",
        "File",
        "Form",
        "FormBackup",
        "FormSearch",
        "Keyboard",
        "Language",
        "MorphemeLanguageModel",
        "MorphemeLanguageModelBackup",
        "MorphologicalParser",
        "MorphologicalParserBackup",
        "Morphology",
        "MorphologyBackup",
        "Orthography",
        "Phonology",
        "PhonologyBackup",
        "Source",
        "Speaker",
        "SyntacticCategory",
        "Tag",
        "Translation",
        "User",
    ];

    #[test]
    fn test_old_schema_builds() {
        let registry = old_schema().unwrap();
        assert_eq!(registry.len(), OLD_ENTITIES.len());
        assert_eq!(registry.searchable_entity_names(), OLD_ENTITIES.to_vec());
        for name in OLD_ENTITIES {
            let entity = registry.searchable_entity(name).unwrap();
            assert!(entity.primary_key_attribute().is_some(), "{} has no key", name);
        }
    }

    #[test]
    fn test_memorizer_alias() {
        let registry = old_schema().unwrap();
        let (entity, alias) = registry.searchable_entity_or_alias("Memorizer").unwrap();
        assert_eq!(entity.name(), "User");
        let alias = alias.unwrap();
        for allowed in ["id", "first_name", "last_name", "role"] {
            assert!(alias.allows(allowed));
        }
        assert!(!alias.allows("email"));
        assert!(registry.searchable_entity("Memorizer").is_none());
    }

    #[test]
    fn test_model_relations() {
        let registry = old_schema().unwrap();
        let relation = |entity: &str, name: &str| {
            registry
                .entity(entity)
                .and_then(|e| e.relation(name))
                .map(|r| r.target.as_str())
        };
        assert_eq!(relation("User", "input_orthography"), Some("Orthography"));
        assert_eq!(relation("User", "output_orthography"), Some("Orthography"));
        assert_eq!(
            relation("MorphologicalParser", "language_model"),
            Some("MorphemeLanguageModel")
        );
        assert_eq!(relation("MorphologicalParser", "phonology"), Some("Phonology"));
        assert_eq!(relation("Morphology", "rules_corpus"), Some("Corpus"));
        assert_eq!(
            relation("MorphemeLanguageModel", "vocabulary_morphology"),
            Some("Morphology")
        );
        assert_eq!(relation("Corpus", "form_search"), Some("FormSearch"));
        assert_eq!(relation("Keyboard", "modifier"), Some("User"));

        let backup = registry.entity("FormBackup").unwrap();
        assert!(backup.relations().is_empty());
        assert_eq!(
            backup.attribute("enterer").unwrap().scalar_type,
            ScalarType::String
        );
        assert_eq!(
            registry
                .entity("Orthography")
                .unwrap()
                .attribute("lowercase")
                .unwrap()
                .scalar_type,
            ScalarType::Boolean
        );
    }

    #[test]
    fn test_form_default_traversals() {
        let registry = old_schema().unwrap();
        let form = registry.entity("Form").unwrap();
        assert_eq!(form.default_traversal_to("File").unwrap().name, "files");
        assert_eq!(
            form.default_traversal_to("Translation").unwrap().name,
            "translations"
        );
        assert_eq!(
            form.default_traversal_to("Memorizer").unwrap().name,
            "memorizers"
        );
        assert!(form.default_traversal_to("User").is_none());
        assert!(form.default_traversal_to("Speaker").is_none());
        assert_eq!(form.relations_to("User").count(), 5);
    }

    #[test]
    fn test_relation_cardinalities() {
        let registry = old_schema().unwrap();
        let form = registry.entity("Form").unwrap();
        assert_eq!(form.relation("enterer").unwrap().cardinality, Cardinality::ToOne);
        assert_eq!(form.relation("files").unwrap().cardinality, Cardinality::ToMany);
        assert_eq!(
            form.relation("translations").unwrap().cardinality,
            Cardinality::ToMany
        );
    }

    #[test]
    fn test_table_names_follow_old_layout() {
        let registry = old_schema().unwrap();
        assert_eq!(registry.entity("SyntacticCategory").unwrap().table(), "syntacticcategory");
        assert_eq!(registry.entity("Form").unwrap().table(), "form");
        assert_eq!(registry.entity("Language").unwrap().primary_key(), "Id");
        assert_eq!(
            registry.entity("MorphemeLanguageModelBackup").unwrap().table(),
            "morphemelanguagemodelbackup"
        );
        assert_eq!(registry.entity("FormSearch").unwrap().table(), "formsearch");
    }

    #[test]
    fn test_user_secrets_not_searchable() {
        let registry = old_schema().unwrap();
        let user = registry.entity("User").unwrap();
        assert!(user.attribute("password").is_none());
        assert!(user.attribute("salt").is_none());
    }

    #[test]
    fn test_textual_attributes_typed() {
        let registry = old_schema().unwrap();
        let form = registry.entity("Form").unwrap();
        assert_eq!(
            form.attribute("date_elicited").unwrap().scalar_type,
            ScalarType::Date
        );
        assert!(form.attribute("transcription").unwrap().scalar_type.is_textual());
    }
}
