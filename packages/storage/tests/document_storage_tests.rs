// ABOUTME: Integration tests for document and section storage
// ABOUTME: Tests section ordering, reorder validation, content versioning, and cascade deletion

use doculens_core::{
    CreateDocumentInput, CreateSectionInput, DocumentStatus, ReviewStatus, SectionOrder,
    UpdateSectionInput,
};
use doculens_storage::{connect, connect_in_memory, DocumentStorage, StorageError};
use pretty_assertions::assert_eq;

async fn create_test_storage() -> DocumentStorage {
    let pool = connect_in_memory().await.unwrap();
    let storage = DocumentStorage::new(pool);
    storage.migrate().await.unwrap();
    storage
}

fn section_input(title: &str) -> CreateSectionInput {
    CreateSectionInput {
        title: title.to_string(),
        description: format!("About {}", title),
        display_order: None,
        is_included: true,
    }
}

#[tokio::test]
async fn test_create_document_starts_in_draft() {
    let storage = create_test_storage().await;

    let doc = storage
        .create_document(CreateDocumentInput {
            title: "  Architecture Guide ".to_string(),
        })
        .await
        .unwrap();

    assert!(doc.id.starts_with("doc-"));
    assert_eq!(doc.title, "Architecture Guide");
    assert_eq!(doc.status, DocumentStatus::Draft);
    assert_eq!(doc.review_status, ReviewStatus::Draft);
    assert_eq!(doc.current_version, 0);
    assert!(doc.sections.is_empty());
}

#[tokio::test]
async fn test_create_document_rejects_empty_title() {
    let storage = create_test_storage().await;

    let result = storage
        .create_document(CreateDocumentInput {
            title: " ".to_string(),
        })
        .await;

    assert!(matches!(result, Err(StorageError::InvalidInput(_))));
}

#[tokio::test]
async fn test_sections_append_in_display_order() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();

    for title in ["Overview", "Architecture", "API"] {
        storage.add_section(&doc.id, section_input(title)).await.unwrap();
    }

    let doc = storage.get_document(&doc.id).await.unwrap();
    let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
    let orders: Vec<i32> = doc.sections.iter().map(|s| s.display_order).collect();

    assert_eq!(titles, vec!["Overview", "Architecture", "API"]);
    assert_eq!(orders, vec![1, 2, 3]);
    assert!(doc.sections.iter().all(|s| s.content.is_none()));
}

#[tokio::test]
async fn test_add_section_rejects_taken_order() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    storage.add_section(&doc.id, section_input("Overview")).await.unwrap();

    let mut input = section_input("Duplicate");
    input.display_order = Some(1);
    let result = storage.add_section(&doc.id, input).await;

    assert!(matches!(result, Err(StorageError::InvalidInput(_))));
}

#[tokio::test]
async fn test_reorder_swaps_sections() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    let a = storage.add_section(&doc.id, section_input("A")).await.unwrap();
    let b = storage.add_section(&doc.id, section_input("B")).await.unwrap();
    let c = storage.add_section(&doc.id, section_input("C")).await.unwrap();

    storage
        .reorder_sections(
            &doc.id,
            &[
                SectionOrder {
                    id: a.id.clone(),
                    display_order: 3,
                },
                SectionOrder {
                    id: c.id.clone(),
                    display_order: 1,
                },
            ],
        )
        .await
        .unwrap();

    let doc = storage.get_document(&doc.id).await.unwrap();
    let ids: Vec<&str> = doc.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![c.id.as_str(), b.id.as_str(), a.id.as_str()]);
}

#[tokio::test]
async fn test_reorder_rejects_duplicates_and_foreign_sections() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    let a = storage.add_section(&doc.id, section_input("A")).await.unwrap();
    let b = storage.add_section(&doc.id, section_input("B")).await.unwrap();

    let duplicate = storage
        .reorder_sections(
            &doc.id,
            &[SectionOrder {
                id: a.id.clone(),
                display_order: b.display_order,
            }],
        )
        .await;
    assert!(matches!(duplicate, Err(StorageError::InvalidInput(_))));

    let repeated = storage
        .reorder_sections(
            &doc.id,
            &[
                SectionOrder {
                    id: a.id.clone(),
                    display_order: 2,
                },
                SectionOrder {
                    id: a.id.clone(),
                    display_order: 3,
                },
            ],
        )
        .await;
    assert!(matches!(repeated, Err(StorageError::InvalidInput(_))));

    let foreign = storage
        .reorder_sections(
            &doc.id,
            &[SectionOrder {
                id: "sec-elsewhere".to_string(),
                display_order: 9,
            }],
        )
        .await;
    assert!(matches!(foreign, Err(StorageError::InvalidInput(_))));

    // Nothing moved
    let doc = storage.get_document(&doc.id).await.unwrap();
    let ids: Vec<&str> = doc.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
}

#[tokio::test]
async fn test_section_content_is_versioned() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    let section = storage.add_section(&doc.id, section_input("Overview")).await.unwrap();

    let v1 = storage
        .save_section_content(&doc.id, &section.id, "first draft", true)
        .await
        .unwrap();
    let v2 = storage
        .save_section_content(&doc.id, &section.id, "edited by hand", false)
        .await
        .unwrap();

    assert_eq!((v1, v2), (1, 2));

    let section = storage.get_section(&doc.id, &section.id).await.unwrap();
    assert_eq!(section.content.as_deref(), Some("edited by hand"));
    assert_eq!(section.content_version, Some(2));
}

#[tokio::test]
async fn test_save_content_for_foreign_section_fails() {
    let storage = create_test_storage().await;
    let first = storage
        .create_document(CreateDocumentInput {
            title: "First".to_string(),
        })
        .await
        .unwrap();
    let second = storage
        .create_document(CreateDocumentInput {
            title: "Second".to_string(),
        })
        .await
        .unwrap();
    let section = storage.add_section(&first.id, section_input("Overview")).await.unwrap();

    let result = storage
        .save_section_content(&second.id, &section.id, "wrong document", true)
        .await;

    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn test_update_section_toggles_inclusion() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    let section = storage.add_section(&doc.id, section_input("Appendix")).await.unwrap();

    let updated = storage
        .update_section(
            &doc.id,
            &section.id,
            UpdateSectionInput {
                is_included: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.is_included);
    assert_eq!(updated.title, "Appendix");
    assert_eq!(updated.description, "About Appendix");
}

#[tokio::test]
async fn test_delete_document_cascades_to_sections() {
    let storage = create_test_storage().await;
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    let section = storage.add_section(&doc.id, section_input("Overview")).await.unwrap();
    storage
        .save_section_content(&doc.id, &section.id, "text", true)
        .await
        .unwrap();

    storage.delete_document(&doc.id).await.unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_sections")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(matches!(
        storage.get_document(&doc.id).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("doculens.db").display());

    let storage = DocumentStorage::new(connect(&url).await.unwrap());
    storage.migrate().await.unwrap();
    let doc = storage
        .create_document(CreateDocumentInput {
            title: "Guide".to_string(),
        })
        .await
        .unwrap();
    storage.add_section(&doc.id, section_input("Overview")).await.unwrap();
    storage.pool().close().await;

    let reopened = DocumentStorage::new(connect(&url).await.unwrap());
    reopened.migrate().await.unwrap();
    let doc = reopened.get_document(&doc.id).await.unwrap();
    assert_eq!(doc.title, "Guide");
    assert_eq!(doc.sections.len(), 1);
}
