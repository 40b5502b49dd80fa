//! Discussion topic and comment endpoints

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Json, Router};
use qcat_common::db::discussions;
use qcat_common::models::{
    DiscussionComment, DiscussionCommentInput, DiscussionTopic, DiscussionTopicInput,
};
use qcat_common::{Page, PageRequest};
use uuid::Uuid;

use super::created;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

pub async fn list_topics(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<DiscussionTopic>>> {
    let request = state.page_request(query);
    Ok(Json(discussions::find_all_topics(&state.db, &request).await?))
}

pub async fn create_topic(
    State(state): State<AppState>,
    AppJson(input): AppJson<DiscussionTopicInput>,
) -> ApiResult<Response> {
    let topic = discussions::create_topic(&state.db, &input).await?;
    Ok(created(format!("/v1/discussion-topics/{}", topic.id), topic))
}

pub async fn get_topic(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<DiscussionTopic>> {
    Ok(Json(discussions::find_topic(&state.db, id).await?))
}

pub async fn update_topic(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<DiscussionTopicInput>,
) -> ApiResult<Json<DiscussionTopic>> {
    Ok(Json(discussions::update_topic(&state.db, id, &input).await?))
}

/// DELETE /v1/discussion-topics/:id
///
/// Comments of the topic go with it.
pub async fn delete_topic(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    discussions::delete_topic(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/discussion-topics/:id/discussion-comments
///
/// Oldest comment first.
pub async fn list_comments(
    State(state): State<AppState>,
    AppPath(topic_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageRequest>,
) -> ApiResult<Json<Page<DiscussionComment>>> {
    let request = state.page_request(query);
    Ok(Json(
        discussions::find_comments(&state.db, topic_id, &request).await?,
    ))
}

pub async fn create_comment(
    State(state): State<AppState>,
    AppPath(topic_id): AppPath<Uuid>,
    AppJson(input): AppJson<DiscussionCommentInput>,
) -> ApiResult<Response> {
    let comment = discussions::create_comment(&state.db, topic_id, &input).await?;
    Ok(created(
        format!(
            "/v1/discussion-topics/{}/discussion-comments/{}",
            topic_id, comment.id
        ),
        comment,
    ))
}

pub async fn get_comment(
    State(state): State<AppState>,
    AppPath((topic_id, comment_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DiscussionComment>> {
    Ok(Json(
        discussions::find_comment(&state.db, topic_id, comment_id).await?,
    ))
}

pub async fn update_comment(
    State(state): State<AppState>,
    AppPath((topic_id, comment_id)): AppPath<(Uuid, Uuid)>,
    AppJson(input): AppJson<DiscussionCommentInput>,
) -> ApiResult<Json<DiscussionComment>> {
    Ok(Json(
        discussions::update_comment(&state.db, topic_id, comment_id, &input).await?,
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AppPath((topic_id, comment_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    discussions::delete_comment(&state.db, topic_id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build discussion routes
pub fn discussion_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/discussion-topics",
            get(list_topics).post(create_topic),
        )
        .route(
            "/v1/discussion-topics/:id",
            get(get_topic).put(update_topic).delete(delete_topic),
        )
        .route(
            "/v1/discussion-topics/:id/discussion-comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/v1/discussion-topics/:id/discussion-comments/:comment_id",
            get(get_comment)
                .put(update_comment)
                .delete(delete_comment),
        )
}
