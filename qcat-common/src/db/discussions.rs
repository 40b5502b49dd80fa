//! Discussion topics and comments
//!
//! Comments belong to one topic and may reply to another comment of the same
//! topic. Deleting a topic deletes its comments; deleting a comment detaches
//! its replies.

use super::retry::{retry_on_lock, LOCK_WAIT};
use super::{ensure_exists, list_named_by};
use crate::models::{
    DiscussionComment, DiscussionCommentInput, DiscussionTopic, DiscussionTopicInput,
};
use crate::pagination::{Page, PageRequest};
use crate::uuid_utils;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub(crate) fn map_topic(row: &SqliteRow) -> Result<DiscussionTopic> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(DiscussionTopic {
        id: uuid_utils::parse_column("discussion_topics.id", &id)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: crate::models::parse_stored("discussion_topics.status", &status)?,
        date: row.try_get("date")?,
    })
}

pub(crate) fn map_comment(row: &SqliteRow) -> Result<DiscussionComment> {
    let id: String = row.try_get("id")?;
    let topic_id: String = row.try_get("topic_id")?;
    Ok(DiscussionComment {
        id: uuid_utils::parse_column("discussion_comments.id", &id)?,
        topic_id: uuid_utils::parse_column("discussion_comments.topic_id", &topic_id)?,
        text: row.try_get("text")?,
        date: row.try_get("date")?,
        reply_to_id: uuid_utils::parse_optional_column(
            "discussion_comments.reply_to_id",
            row.try_get("reply_to_id")?,
        )?,
    })
}

// Topics

/// Page of topics, optionally filtered by title
pub async fn find_all_topics(
    pool: &SqlitePool,
    request: &PageRequest,
) -> Result<Page<DiscussionTopic>> {
    list_named_by(pool, "discussion_topics", "title", request, map_topic).await
}

pub async fn find_topic(pool: &SqlitePool, id: Uuid) -> Result<DiscussionTopic> {
    let row = sqlx::query("SELECT * FROM discussion_topics WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Discussion topic", id))?;
    map_topic(&row)
}

pub async fn create_topic(
    pool: &SqlitePool,
    input: &DiscussionTopicInput,
) -> Result<DiscussionTopic> {
    input.validate()?;
    let id = uuid_utils::generate();

    sqlx::query(
        "INSERT INTO discussion_topics (id, title, description, status, date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(input.title.trim())
    .bind(input.description())
    .bind(input.status.as_str())
    .bind(input.date.unwrap_or_else(Utc::now))
    .execute(pool)
    .await?;

    info!("Created discussion topic {} ({})", input.title.trim(), id);
    find_topic(pool, id).await
}

/// Overwrite title, description and status; an omitted date keeps the stored one
pub async fn update_topic(
    pool: &SqlitePool,
    id: Uuid,
    input: &DiscussionTopicInput,
) -> Result<DiscussionTopic> {
    input.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE discussion_topics
        SET title = ?, description = ?, status = ?, date = COALESCE(?, date)
        WHERE id = ?
        "#,
    )
    .bind(input.title.trim())
    .bind(input.description())
    .bind(input.status.as_str())
    .bind(input.date)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Discussion topic", id));
    }
    find_topic(pool, id).await
}

/// Delete a topic together with all of its comments
pub async fn delete_topic(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM discussion_topics WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Discussion topic", id));
    }
    info!("Deleted discussion topic {}", id);
    Ok(())
}

// Comments

/// Comments of a topic in creation order
pub async fn find_comments(
    pool: &SqlitePool,
    topic_id: Uuid,
    request: &PageRequest,
) -> Result<Page<DiscussionComment>> {
    let key = topic_id.to_string();
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "discussion_topics", "id", &key, "Discussion topic").await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM discussion_comments WHERE topic_id = ?",
    )
    .bind(&key)
    .fetch_one(&mut *conn)
    .await?;

    let pagination = request.pagination(total);
    let rows = sqlx::query(
        "SELECT * FROM discussion_comments WHERE topic_id = ? ORDER BY rowid LIMIT ? OFFSET ?",
    )
    .bind(&key)
    .bind(pagination.size)
    .bind(pagination.offset)
    .fetch_all(&mut *conn)
    .await?;

    let content = rows.iter().map(map_comment).collect::<Result<Vec<_>>>()?;
    Ok(Page::new(content, pagination, total))
}

async fn find_comment_in(
    conn: &mut SqliteConnection,
    topic_id: Uuid,
    comment_id: Uuid,
) -> Result<DiscussionComment> {
    let row = sqlx::query("SELECT * FROM discussion_comments WHERE id = ? AND topic_id = ?")
        .bind(comment_id.to_string())
        .bind(topic_id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Discussion comment", comment_id))?;
    map_comment(&row)
}

pub async fn find_comment(
    pool: &SqlitePool,
    topic_id: Uuid,
    comment_id: Uuid,
) -> Result<DiscussionComment> {
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, "discussion_topics", "id", &topic_id.to_string(), "Discussion topic")
        .await?;
    find_comment_in(&mut conn, topic_id, comment_id).await
}

/// A reply must target another comment of the same topic
async fn check_reply_to(
    conn: &mut SqliteConnection,
    topic_id: Uuid,
    comment_id: Uuid,
    reply_to_id: Option<Uuid>,
) -> Result<()> {
    let Some(reply_to_id) = reply_to_id else {
        return Ok(());
    };
    if reply_to_id == comment_id {
        return Err(Error::InvalidInput(
            "A comment cannot reply to itself".to_string(),
        ));
    }
    find_comment_in(conn, topic_id, reply_to_id)
        .await
        .map_err(|e| match e {
            Error::NotFound(_) => Error::InvalidInput(format!(
                "Comment {} is not part of topic {}",
                reply_to_id, topic_id
            )),
            other => other,
        })?;
    Ok(())
}

pub async fn create_comment(
    pool: &SqlitePool,
    topic_id: Uuid,
    input: &DiscussionCommentInput,
) -> Result<DiscussionComment> {
    retry_on_lock("discussions::create_comment", LOCK_WAIT, || {
        create_comment_once(pool, topic_id, input)
    })
    .await
}

async fn create_comment_once(
    pool: &SqlitePool,
    topic_id: Uuid,
    input: &DiscussionCommentInput,
) -> Result<DiscussionComment> {
    input.validate()?;
    let id = uuid_utils::generate();

    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "discussion_topics", "id", &topic_id.to_string(), "Discussion topic")
        .await?;
    check_reply_to(&mut tx, topic_id, id, input.reply_to_id).await?;

    sqlx::query(
        "INSERT INTO discussion_comments (id, topic_id, text, date, reply_to_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(topic_id.to_string())
    .bind(input.text.trim())
    .bind(input.date.unwrap_or_else(Utc::now))
    .bind(input.reply_to_id.map(|r| r.to_string()))
    .execute(&mut *tx)
    .await?;

    let created = find_comment_in(&mut tx, topic_id, id).await?;
    tx.commit().await?;

    info!("Created comment {} in topic {}", id, topic_id);
    Ok(created)
}

pub async fn update_comment(
    pool: &SqlitePool,
    topic_id: Uuid,
    comment_id: Uuid,
    input: &DiscussionCommentInput,
) -> Result<DiscussionComment> {
    retry_on_lock("discussions::update_comment", LOCK_WAIT, || {
        update_comment_once(pool, topic_id, comment_id, input)
    })
    .await
}

async fn update_comment_once(
    pool: &SqlitePool,
    topic_id: Uuid,
    comment_id: Uuid,
    input: &DiscussionCommentInput,
) -> Result<DiscussionComment> {
    input.validate()?;

    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "discussion_topics", "id", &topic_id.to_string(), "Discussion topic")
        .await?;
    find_comment_in(&mut tx, topic_id, comment_id).await?;
    check_reply_to(&mut tx, topic_id, comment_id, input.reply_to_id).await?;

    sqlx::query(
        "UPDATE discussion_comments SET text = ?, date = COALESCE(?, date), reply_to_id = ? WHERE id = ?",
    )
    .bind(input.text.trim())
    .bind(input.date)
    .bind(input.reply_to_id.map(|r| r.to_string()))
    .bind(comment_id.to_string())
    .execute(&mut *tx)
    .await?;

    let updated = find_comment_in(&mut tx, topic_id, comment_id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Delete a comment; replies to it keep existing without a parent
pub async fn delete_comment(pool: &SqlitePool, topic_id: Uuid, comment_id: Uuid) -> Result<()> {
    retry_on_lock("discussions::delete_comment", LOCK_WAIT, || {
        delete_comment_once(pool, topic_id, comment_id)
    })
    .await
}

async fn delete_comment_once(pool: &SqlitePool, topic_id: Uuid, comment_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "discussion_topics", "id", &topic_id.to_string(), "Discussion topic")
        .await?;
    find_comment_in(&mut tx, topic_id, comment_id).await?;

    sqlx::query("DELETE FROM discussion_comments WHERE id = ?")
        .bind(comment_id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted comment {} of topic {}", comment_id, topic_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::models::TopicStatus;

    #[tokio::test]
    async fn test_comment_pagination() {
        let pool = init_memory_database().await.unwrap();
        let input = DiscussionTopicInput::new("Noise models", TopicStatus::Open);
        let topic = create_topic(&pool, &input).await.unwrap();

        let first = create_comment(&pool, topic.id, &DiscussionCommentInput::new("First"))
            .await
            .unwrap();
        let reply = create_comment(
            &pool,
            topic.id,
            &DiscussionCommentInput::new("Reply").replying_to(first.id),
        )
        .await
        .unwrap();
        assert_eq!(reply.reply_to_id, Some(first.id));

        let page = find_comments(&pool, topic.id, &PageRequest::new(0, 1)).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].id, first.id);
        assert_eq!(page.page.total_elements, 2);
        assert_eq!(page.page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_reply_across_topics_rejected() {
        let pool = init_memory_database().await.unwrap();
        let t1 = create_topic(&pool, &DiscussionTopicInput::new("T1", TopicStatus::Open))
            .await
            .unwrap();
        let t2 = create_topic(&pool, &DiscussionTopicInput::new("T2", TopicStatus::Open))
            .await
            .unwrap();
        let c1 = create_comment(&pool, t1.id, &DiscussionCommentInput::new("in t1"))
            .await
            .unwrap();

        let err = create_comment(
            &pool,
            t2.id,
            &DiscussionCommentInput::new("cross").replying_to(c1.id),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = update_comment(
            &pool,
            t1.id,
            c1.id,
            &DiscussionCommentInput::new("self").replying_to(c1.id),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_comment_detaches_replies() {
        let pool = init_memory_database().await.unwrap();
        let topic = create_topic(&pool, &DiscussionTopicInput::new("T", TopicStatus::Open))
            .await
            .unwrap();
        let parent = create_comment(&pool, topic.id, &DiscussionCommentInput::new("parent"))
            .await
            .unwrap();
        let reply = create_comment(
            &pool,
            topic.id,
            &DiscussionCommentInput::new("reply").replying_to(parent.id),
        )
        .await
        .unwrap();

        delete_comment(&pool, topic.id, parent.id).await.unwrap();
        let reply = find_comment(&pool, topic.id, reply.id).await.unwrap();
        assert_eq!(reply.reply_to_id, None);
    }

    #[tokio::test]
    async fn test_status_update_and_topic_cascade() {
        let pool = init_memory_database().await.unwrap();
        let topic = create_topic(&pool, &DiscussionTopicInput::new("T", TopicStatus::Open))
            .await
            .unwrap();
        create_comment(&pool, topic.id, &DiscussionCommentInput::new("c"))
            .await
            .unwrap();

        let input = DiscussionTopicInput::new("T", TopicStatus::Closed);
        let closed = update_topic(&pool, topic.id, &input).await.unwrap();
        assert_eq!(closed.status, TopicStatus::Closed);
        assert_eq!(closed.date, topic.date);

        delete_topic(&pool, topic.id).await.unwrap();
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM discussion_comments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
