use agora::AgoraError;
use agora::engine::content::{
    CommentDraft, ItemKind, PostDraft, create_comment, create_post, delete_agoragram,
    get_agoragram, get_by_short_id, initialize_agora_db, update_body,
};
use agora::engine::users::{create_user, get_user};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    initialize_agora_db(&root).unwrap();
    (tmp, root)
}

fn text_post(title: &str, tags: &[&str]) -> PostDraft {
    PostDraft {
        kind: ItemKind::Text,
        title: title.to_string(),
        body: "body".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        hypagora: None,
    }
}

fn comment_on(root: &Path, author: &str, reply_to: &str) -> agora::engine::content::Agoragram {
    create_comment(
        root,
        author,
        &CommentDraft {
            body: "a reply".to_string(),
            reply_to: reply_to.to_string(),
        },
    )
    .unwrap()
}

#[test]
fn test_post_creation_shape() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "Astrid", "Berg").unwrap();

    let post = create_post(&root, &u1.id, &text_post("First light", &["a", "b"])).unwrap();
    assert_eq!(post.kind, ItemKind::Text);
    assert_eq!(post.short_id.chars().count(), 7);
    assert_eq!(post.author.as_deref(), Some(u1.id.as_str()));
    assert_eq!(post.title.as_deref(), Some("First light"));
    assert_eq!(post.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(post.stars, 0);
    assert_eq!(post.comment_amount, Some(0));
    assert!(post.children.is_empty());
    assert!(post.post.is_none());
    assert!(post.reply_to.is_none());

    // The author's post score is bumped by the independent write.
    let u1 = get_user(&root, &u1.id).unwrap().unwrap();
    assert_eq!(u1.score_posts, 1);

    let by_short = get_by_short_id(&root, &post.short_id).unwrap().unwrap();
    assert_eq!(by_short.id, post.id);
}

#[test]
fn test_short_ids_are_unique_and_fixed_length() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();

    let mut seen = std::collections::HashSet::new();
    for i in 0..25 {
        let post = create_post(&root, &u1.id, &text_post(&format!("post {}", i), &[])).unwrap();
        assert_eq!(post.short_id.chars().count(), 7);
        assert!(seen.insert(post.short_id));
    }
}

#[test]
fn test_comment_tree_linkage_and_accounting() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let post = create_post(&root, &u1.id, &text_post("Thread", &[])).unwrap();
    let c1 = comment_on(&root, &u2.id, &post.id);
    let c2 = comment_on(&root, &u2.id, &c1.id);

    assert_eq!(c1.kind, ItemKind::Comment);
    assert_eq!(c1.reply_to.as_deref(), Some(post.id.as_str()));
    let c1_post = c1.post.as_ref().unwrap();
    assert_eq!(c1_post.id, post.id);
    assert_eq!(c1_post.short_id, post.short_id);

    // The root pointer is inherited transitively through the parent comment.
    let c2_post = c2.post.as_ref().unwrap();
    assert_eq!(c2_post.id, post.id);
    assert_eq!(c2.reply_to.as_deref(), Some(c1.id.as_str()));

    // commentAmount counts all descendants of the root, not direct children.
    let post = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert_eq!(post.comment_amount, Some(2));
    assert_eq!(post.children.len(), 1);
    assert_eq!(post.children[0].id, c1.id);
    assert_eq!(post.children[0].stars, 0);

    let c1 = get_agoragram(&root, &c1.id).unwrap().unwrap();
    assert_eq!(c1.children.len(), 1);
    assert_eq!(c1.children[0].id, c2.id);
    // Comments carry no descendant counter of their own.
    assert_eq!(c1.comment_amount, None);

    let u2 = get_user(&root, &u2.id).unwrap().unwrap();
    assert_eq!(u2.score_comments, 2);
}

#[test]
fn test_comment_on_missing_parent_is_not_found() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let err = create_comment(
        &root,
        &u1.id,
        &CommentDraft {
            body: "into the void".to_string(),
            reply_to: "01JUNKJUNKJUNKJUNKJUNKJUNK".to_string(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, AgoraError::NotFound(_)));
}

#[test]
fn test_update_body_sets_modified() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let post = create_post(&root, &u1.id, &text_post("Editable", &[])).unwrap();
    assert!(post.modified.is_none());

    let updated = update_body(&root, &post.id, "new body").unwrap();
    assert_eq!(updated.body, "new body");
    assert!(updated.modified.is_some());
    // No cascading effects.
    assert_eq!(updated.comment_amount, Some(0));
}

#[test]
fn test_update_missing_is_not_found() {
    let (_tmp, root) = setup();
    let err = update_body(&root, "nope", "body").unwrap_err();
    assert!(matches!(err, AgoraError::NotFound(_)));
}

#[test]
fn test_delete_leaf_removes_document_and_parent_entry() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let post = create_post(&root, &u1.id, &text_post("Thread", &[])).unwrap();
    let c1 = comment_on(&root, &u2.id, &post.id);

    delete_agoragram(&root, &c1.id).unwrap();
    assert!(get_agoragram(&root, &c1.id).unwrap().is_none());

    // The ranking cache names only children that still exist.
    let post = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert!(post.children.is_empty());
    // Ancestor accounting is never decremented by deletes.
    assert_eq!(post.comment_amount, Some(1));
}

#[test]
fn test_delete_non_leaf_tombstones() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let post = create_post(&root, &u1.id, &text_post("Thread", &[])).unwrap();
    let c1 = comment_on(&root, &u2.id, &post.id);

    delete_agoragram(&root, &post.id).unwrap();
    let post = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert!(post.author.is_none());
    assert_eq!(post.body, "");
    assert!(post.deleted.is_some());
    // Children survive and stay retrievable.
    assert_eq!(post.children.len(), 1);
    assert!(get_agoragram(&root, &c1.id).unwrap().is_some());
}

#[test]
fn test_delete_missing_is_not_found() {
    let (_tmp, root) = setup();
    let err = delete_agoragram(&root, "nope").unwrap_err();
    assert!(matches!(err, AgoraError::NotFound(_)));
}

#[test]
fn test_create_post_rejects_comment_kind() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let draft = PostDraft {
        kind: ItemKind::Comment,
        title: "not a post".to_string(),
        body: String::new(),
        tags: vec![],
        hypagora: None,
    };
    assert!(matches!(
        create_post(&root, &u1.id, &draft).unwrap_err(),
        AgoraError::Validation(_)
    ));
}
