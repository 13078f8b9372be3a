use agora::AgoraError;
use agora::engine::content::{
    CommentDraft, ItemKind, PostDraft, create_comment, create_post, delete_agoragram,
    get_agoragram, initialize_agora_db,
};
use agora::engine::stars::{StarAction, check_starred, toggle_star};
use agora::engine::users::{create_user, get_user};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    initialize_agora_db(&root).unwrap();
    (tmp, root)
}

fn post_by(root: &Path, author: &str, title: &str) -> agora::engine::content::Agoragram {
    create_post(
        root,
        author,
        &PostDraft {
            kind: ItemKind::Text,
            title: title.to_string(),
            body: "body".to_string(),
            tags: vec![],
            hypagora: None,
        },
    )
    .unwrap()
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
fn test_double_toggle_round_trips() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let post = post_by(&root, &u1.id, "T");
    let c1 = comment_on(&root, &u2.id, &post.id);

    assert_eq!(toggle_star(&root, &u1.id, &c1.id).unwrap(), StarAction::Starred);
    let c1_now = get_agoragram(&root, &c1.id).unwrap().unwrap();
    assert_eq!(c1_now.stars, 1);
    let parent = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert_eq!(parent.children[0].id, c1.id);
    assert_eq!(parent.children[0].stars, 1);

    assert_eq!(
        toggle_star(&root, &u1.id, &c1.id).unwrap(),
        StarAction::Unstarred
    );
    let c1_now = get_agoragram(&root, &c1.id).unwrap().unwrap();
    assert_eq!(c1_now.stars, 0);
    let parent = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert_eq!(parent.children[0].stars, 0);

    let u1 = get_user(&root, &u1.id).unwrap().unwrap();
    assert!(u1.starred.is_empty());
}

#[test]
fn test_star_count_matches_set_membership_at_quiescence() {
    let (_tmp, root) = setup();
    let author = create_user(&root, "astrid", "", "").unwrap();
    let voters: Vec<_> = (0..4)
        .map(|i| create_user(&root, &format!("voter{}", i), "", "").unwrap())
        .collect();

    let a = post_by(&root, &author.id, "A");
    let b = post_by(&root, &author.id, "B");

    toggle_star(&root, &voters[0].id, &a.id).unwrap();
    toggle_star(&root, &voters[1].id, &a.id).unwrap();
    toggle_star(&root, &voters[2].id, &a.id).unwrap();
    toggle_star(&root, &voters[2].id, &a.id).unwrap(); // net zero for voter 2
    toggle_star(&root, &voters[3].id, &b.id).unwrap();

    for item_id in [&a.id, &b.id] {
        let item = get_agoragram(&root, item_id).unwrap().unwrap();
        let membership = voters
            .iter()
            .filter(|v| {
                get_user(&root, &v.id)
                    .unwrap()
                    .unwrap()
                    .starred
                    .contains(item_id)
            })
            .count() as i64;
        assert_eq!(item.stars, membership);
    }
}

#[test]
fn test_children_index_stays_sorted_descending() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let voters: Vec<_> = (0..3)
        .map(|i| create_user(&root, &format!("voter{}", i), "", "").unwrap())
        .collect();

    let post = post_by(&root, &u1.id, "ranked");
    let c1 = comment_on(&root, &u1.id, &post.id);
    let c2 = comment_on(&root, &u1.id, &post.id);
    let c3 = comment_on(&root, &u1.id, &post.id);

    // c3 gets two stars, c2 one, c1 none.
    toggle_star(&root, &voters[0].id, &c3.id).unwrap();
    toggle_star(&root, &voters[1].id, &c3.id).unwrap();
    toggle_star(&root, &voters[2].id, &c2.id).unwrap();

    let parent = get_agoragram(&root, &post.id).unwrap().unwrap();
    let ranked: Vec<(&str, i64)> = parent
        .children
        .iter()
        .map(|c| (c.id.as_str(), c.stars))
        .collect();
    assert_eq!(
        ranked,
        vec![(c3.id.as_str(), 2), (c2.id.as_str(), 1), (c1.id.as_str(), 0)]
    );

    // Unstar c3 twice; ranking reflects every settled delta.
    toggle_star(&root, &voters[0].id, &c3.id).unwrap();
    toggle_star(&root, &voters[1].id, &c3.id).unwrap();
    let parent = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert_eq!(parent.children[0].id, c2.id);
    for window in parent.children.windows(2) {
        assert!(window[0].stars >= window[1].stars);
    }
    assert_eq!(parent.children.len(), 3);
}

#[test]
fn test_author_score_tracks_deltas() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let post = post_by(&root, &u1.id, "scored");
    toggle_star(&root, &u2.id, &post.id).unwrap();
    assert_eq!(get_user(&root, &u1.id).unwrap().unwrap().score_stars, 1);
    toggle_star(&root, &u2.id, &post.id).unwrap();
    assert_eq!(get_user(&root, &u1.id).unwrap().unwrap().score_stars, 0);
}

#[test]
fn test_starring_tombstoned_author_item_skips_score() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let post = post_by(&root, &u1.id, "doomed");
    comment_on(&root, &u2.id, &post.id);
    // Non-leaf delete clears the author but keeps the node.
    delete_agoragram(&root, &post.id).unwrap();

    assert_eq!(
        toggle_star(&root, &u2.id, &post.id).unwrap(),
        StarAction::Starred
    );
    let item = get_agoragram(&root, &post.id).unwrap().unwrap();
    assert_eq!(item.stars, 1);
    assert_eq!(get_user(&root, &u1.id).unwrap().unwrap().score_stars, 0);
}

#[test]
fn test_check_starred_intersects_batch() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let u2 = create_user(&root, "birk", "", "").unwrap();

    let a = post_by(&root, &u1.id, "A");
    let b = post_by(&root, &u1.id, "B");
    let c = post_by(&root, &u1.id, "C");

    toggle_star(&root, &u2.id, &a.id).unwrap();
    toggle_star(&root, &u2.id, &c.id).unwrap();

    let batch = vec![a.id.clone(), b.id.clone()];
    let starred = check_starred(&root, &u2.id, &batch).unwrap();
    assert!(starred.contains(&a.id));
    assert!(!starred.contains(&b.id));
    assert!(!starred.contains(&c.id));

    assert!(check_starred(&root, &u2.id, &[]).unwrap().is_empty());
}

#[test]
fn test_toggle_star_unknown_item_or_user() {
    let (_tmp, root) = setup();
    let u1 = create_user(&root, "astrid", "", "").unwrap();
    let post = post_by(&root, &u1.id, "T");

    assert!(matches!(
        toggle_star(&root, &u1.id, "missing").unwrap_err(),
        AgoraError::NotFound(_)
    ));
    assert!(matches!(
        toggle_star(&root, "missing", &post.id).unwrap_err(),
        AgoraError::NotFound(_)
    ));
}
