use search_replace::testing::MemoryStore;
use search_replace::{change_prefix, detect_common_prefix, PrefixError, RunLog, Store};

fn wordpress_site() -> MemoryStore {
    let options = [("option_name", "varchar(191)"), ("option_value", "longtext")];
    MemoryStore::new()
        .with_table("wp_options", &options)
        .with_row("wp_options", &[Some("wp_user_roles"), Some("a:0:{}")])
        .with_row("wp_options", &[Some("siteurl"), Some("http://example.test")])
        .with_table("wp_2_options", &options)
        .with_row("wp_2_options", &[Some("wp_2_user_roles"), Some("a:0:{}")])
        .with_table("wp_usermeta", &[("meta_key", "varchar(255)"), ("meta_value", "longtext")])
        .with_row("wp_usermeta", &[Some("wp_capabilities"), Some("a:0:{}")])
        .with_row("wp_usermeta", &[Some("wp_user_level"), Some("10")])
        .with_row("wp_usermeta", &[Some("nickname"), Some("admin")])
        .with_table("wp_posts", &[("post_title", "text")])
        .with_table("legacy", &[("v", "text")])
}

#[tokio::test]
async fn test_change_prefix_renames_tables_and_keys() {
    let mut store = wordpress_site();
    let mut log = RunLog::new();

    let stats = change_prefix(&mut store, "wp_", "site_", false, &mut log)
        .await
        .unwrap();

    assert_eq!(stats.tables_renamed, 4);
    assert_eq!(stats.tables_failed, 0);
    assert_eq!(stats.keys_rewritten, 4);
    assert_eq!(
        store.list_tables().await.unwrap(),
        vec!["legacy", "site_2_options", "site_options", "site_posts", "site_usermeta"]
    );
    assert_eq!(
        store.column_values("site_options", "option_name"),
        vec![Some("site_user_roles".to_string()), Some("siteurl".to_string())]
    );
    assert_eq!(
        store.column_values("site_2_options", "option_name"),
        vec![Some("site_2_user_roles".to_string())]
    );
    assert_eq!(
        store.column_values("site_usermeta", "meta_key"),
        vec![
            Some("site_capabilities".to_string()),
            Some("site_user_level".to_string()),
            Some("nickname".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_change_prefix_dry_run() {
    let mut store = wordpress_site();
    let mut log = RunLog::new();

    let stats = change_prefix(&mut store, "wp_", "site_", true, &mut log)
        .await
        .unwrap();

    assert!(stats.dry_run);
    assert_eq!(stats.tables_renamed, 4);
    assert_eq!(stats.keys_rewritten, 0);
    assert_eq!(store.mutations(), 0);
    assert!(log.entries().iter().any(|e| e.message.contains("Would rename")));
}

#[tokio::test]
async fn test_change_prefix_skips_taken_names() {
    let mut store = wordpress_site().with_table("site_posts", &[("post_title", "text")]);
    let mut log = RunLog::new();

    let stats = change_prefix(&mut store, "wp_", "site_", false, &mut log)
        .await
        .unwrap();

    assert_eq!(stats.tables_failed, 1);
    assert_eq!(stats.tables_renamed, 3);
    assert!(!stats.all_tables_renamed());
    assert!(store.table_names().contains(&"wp_posts".to_string()));
}

#[tokio::test]
async fn test_change_prefix_reports_failed_renames() {
    let mut store = ["wp_options", "wp_2_options", "wp_usermeta", "wp_posts"]
        .iter()
        .fold(wordpress_site(), |store, table| store.with_failing_writes(table));
    let mut log = RunLog::new();

    let stats = change_prefix(&mut store, "wp_", "site_", false, &mut log)
        .await
        .unwrap();

    assert_eq!(stats.tables_renamed, 0);
    assert_eq!(stats.tables_failed, 4);
    assert!(!stats.all_tables_renamed());
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn test_change_prefix_rejections() {
    let mut store = wordpress_site();
    let mut log = RunLog::new();

    assert!(matches!(
        change_prefix(&mut store, "wp_", "wp_", false, &mut log).await,
        Err(PrefixError::Unchanged(_))
    ));
    assert!(matches!(
        change_prefix(&mut store, "wp_", "bad-prefix", false, &mut log).await,
        Err(PrefixError::Invalid { .. })
    ));
    assert!(matches!(
        change_prefix(&mut store, "blog_", "site_", false, &mut log).await,
        Err(PrefixError::NoTablesWithPrefix(_))
    ));
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn test_detect_prefix_from_store() {
    let mut store = wordpress_site();
    let tables = store.list_tables().await.unwrap();
    assert_eq!(detect_common_prefix(&tables).as_deref(), Some("wp_"));
}
