use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Call sessions
    create_indexes(
        db,
        "call_sessions",
        vec![
            index(bson::doc! { "user_id": 1, "started_at": -1 }),
            index(bson::doc! { "status": 1 }),
        ],
    )
    .await?;

    // Transcript segments (one doc per segment, upserted as captions settle)
    create_indexes(
        db,
        "transcript_segments",
        vec![
            index_unique(bson::doc! { "session_id": 1, "segment_id": 1 }),
            index(bson::doc! { "session_id": 1 }),
        ],
    )
    .await?;

    // Checklist templates
    create_indexes(
        db,
        "checklist_templates",
        vec![index_unique(bson::doc! { "user_id": 1 })],
    )
    .await?;

    // Session checklists (final state written at session end)
    create_indexes(
        db,
        "session_checklists",
        vec![index_unique(bson::doc! { "session_id": 1 })],
    )
    .await?;

    // Generated questions log
    create_indexes(
        db,
        "generated_questions",
        vec![index(bson::doc! { "session_id": 1, "created_at": 1 })],
    )
    .await?;

    info!("MongoDB indexes ensured");
    Ok(())
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}
