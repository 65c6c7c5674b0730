//! Integration tests for refreshing comments of an archive on disk.

use std::fs;
use std::time::Duration;

use chrono::NaiveDate;
use hole_archiver::archive::{read_posts, write_posts, Comment, Post};
use hole_archiver::config::Config;
use hole_archiver::fetch::CommentFetcher;
use hole_archiver::runner::{refresh_comments, RefreshOptions, RefreshSummary};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path as url_path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post(id: i64, reply_count: i64) -> Post {
    let ts = NaiveDate::from_ymd_opt(2017, 5, 4)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let mut post = Post::new(id, ts, 0, reply_count);
    post.body = format!("post {id}\n\n");
    post
}

fn fetcher_for(server: &MockServer) -> CommentFetcher {
    let config = Config {
        comment_api_url: format!("{}/api.php", server.uri()),
        fetch_timeout: Duration::from_millis(200),
        ..Config::for_testing()
    };
    CommentFetcher::from_config(&config).expect("Failed to build fetcher")
}

async fn mount_comments(server: &MockServer, pid: &str, body: &str) {
    Mock::given(method("GET"))
        .and(url_path("/api.php"))
        .and(query_param("pid", pid))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

/// An archive with one complete post, one missing comments, one whose fetch
/// will soft-fail and a placeholder.
fn seeded_archive(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("posts.txt");

    let mut complete = post(40, 1);
    let mut comment = Comment::new(1, complete.created_at);
    comment.body = "already here\n\n".to_string();
    complete.comments.push(comment);

    let posts = vec![
        complete,
        post(39, 2),
        post(38, 1),
        Post::placeholder(37, post(37, 0).created_at),
    ];
    write_posts(&path, &posts).unwrap();
    path
}

#[tokio::test]
async fn test_refresh_fills_missing_comments() {
    let dir = TempDir::new().unwrap();
    let path = seeded_archive(&dir);

    let server = MockServer::start().await;
    mount_comments(
        &server,
        "39",
        r#"{"code":0,"data":[
            {"cid":"7","timestamp":"1500000000","text":"one"},
            {"cid":"8","timestamp":"1500000001","text":"two"},
            {"cid":"9","timestamp":"1500000002","text":"three"}
        ]}"#,
    )
    .await;
    mount_comments(&server, "38", r#"{"code":2,"msg":"deleted"}"#).await;

    let summary = refresh_comments(
        &path,
        &fetcher_for(&server),
        RefreshOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("refresh failed");

    assert_eq!(
        summary,
        RefreshSummary {
            fetched: 1,
            unchanged: 1,
            cleared: 0,
            skipped: 2,
        }
    );

    let posts = read_posts(&path).unwrap();
    assert_eq!(posts.len(), 4);
    assert_eq!(posts[0].comments.len(), 1);
    assert_eq!(posts[1].reply_count, 3);
    assert_eq!(posts[1].comments[2].body, "three\n\n");
    assert_eq!(posts[2], post(38, 1));
    assert!(posts[3].is_placeholder());
}

#[tokio::test]
async fn test_refresh_clears_soft_failures_when_asked() {
    let dir = TempDir::new().unwrap();
    let path = seeded_archive(&dir);

    let server = MockServer::start().await;
    mount_comments(&server, "39", r#"{"code":1}"#).await;
    mount_comments(&server, "38", "not json at all").await;

    let summary = refresh_comments(
        &path,
        &fetcher_for(&server),
        RefreshOptions {
            clear_on_soft_failure: true,
        },
        &CancellationToken::new(),
    )
    .await
    .expect("refresh failed");

    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.cleared, 2);

    let posts = read_posts(&path).unwrap();
    assert_eq!(posts[1].reply_count, 0);
    assert_eq!(posts[2].reply_count, 0);
    assert!(posts[1].comments.is_empty());
}

#[tokio::test]
async fn test_refresh_failure_leaves_archive_untouched() {
    let dir = TempDir::new().unwrap();
    let path = seeded_archive(&dir);
    let before = fs::read_to_string(&path).unwrap();

    let server = MockServer::start().await;
    mount_comments(
        &server,
        "39",
        r#"{"code":0,"data":[{"cid":1,"timestamp":1500000000,"text":"x"}]}"#,
    )
    .await;
    // Post 38 never answers in time
    Mock::given(method("GET"))
        .and(url_path("/api.php"))
        .and(query_param("pid", "38"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = refresh_comments(
        &path,
        &fetcher_for(&server),
        RefreshOptions::default(),
        &CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_cancelled_refresh_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = seeded_archive(&dir);
    let before = fs::read_to_string(&path).unwrap();

    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = refresh_comments(
        &path,
        &fetcher_for(&server),
        RefreshOptions::default(),
        &cancel,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_refresh_of_complete_archive_does_not_rewrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("posts.txt");
    write_posts(&path, &[post(2, 0), post(1, 0)]).unwrap();
    let modified = fs::metadata(&path).unwrap().modified().unwrap();

    let server = MockServer::start().await;
    let summary = refresh_comments(
        &path,
        &fetcher_for(&server),
        RefreshOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .expect("refresh failed");

    assert_eq!(summary.skipped, 2);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
}
