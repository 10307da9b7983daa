//! Tests for tree building and leaf iteration.

use super::*;
use crate::case_params;
use crate::group::{CaseOutcome, TestGroup};
use crate::loader::{ListingEntry, SpecFile, StaticLoader};
use crate::params::{poptions, ParamsBuilder};
use crate::recorder::Status;
use async_trait::async_trait;

fn pass(_: &mut crate::group::CaseContext<'_>) -> CaseOutcome {
    Ok(())
}

fn n_spec() -> Result<SpecFile> {
    let mut g = TestGroup::new();
    g.test("t")?.params(poptions("n", [1, 2]))?.run(pass);
    SpecFile::new("t over n", g)
}

fn demo_loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader
        .readme("demo", &[], "Demo suite.")
        .spec("demo", &["a"], n_spec)
        .spec("demo", &["a", "b"], n_spec);
    loader
}

fn suite1_loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    loader
        .readme("suite1", &[], "desc 1a\ndesc 1b")
        .spec("suite1", &["foo"], || {
            let mut g = TestGroup::new();
            for name in ["hello", "bonjour", "hola"] {
                g.test(name)?.run(pass);
            }
            SpecFile::new("desc 1b", g)
        })
        .readme("suite1", &["bar"], "desc 1f")
        .spec("suite1", &["bar", "buzz", "buzz"], || {
            let mut g = TestGroup::new();
            g.test("zap")?.run(pass);
            SpecFile::new("desc 1d", g)
        })
        .spec("suite1", &["baz"], || {
            let mut g = TestGroup::new();
            g.test("wye")?
                .params(ParamsBuilder::from_cases(vec![
                    case_params! {},
                    case_params! { "x" => 1 },
                ]))?
                .run(pass);
            g.test("zed")?
                .params(ParamsBuilder::from_cases(vec![
                    case_params! { "a" => 1, "b" => 2 },
                    case_params! { "b" => 3, "a" => 1 },
                ]))?
                .run(pass);
            SpecFile::new("desc 1e", g)
        });
    loader
}

fn leaf_keys(tree: &ResultTree) -> Vec<String> {
    tree.iter_leaves().map(|l| l.query.to_string()).collect()
}

async fn count(loader: &StaticLoader, query: &str) -> usize {
    resolve(loader, query).await.unwrap().leaf_count()
}

#[tokio::test]
async fn test_demo_end_to_end() {
    let tree = resolve(&demo_loader(), "demo:a,*").await.unwrap();
    assert_eq!(
        leaf_keys(&tree),
        vec![
            "demo:a:t:n=1",
            "demo:a:t:n=2",
            "demo:a,b:t:n=1",
            "demo:a,b:t:n=2",
        ]
    );
}

#[tokio::test]
async fn test_file_query_excludes_subdirectory() {
    let tree = resolve(&demo_loader(), "demo:a:*").await.unwrap();
    assert_eq!(leaf_keys(&tree), vec!["demo:a:t:n=1", "demo:a:t:n=2"]);
}

#[tokio::test]
async fn test_shared_directory_node() {
    let mut loader = StaticLoader::new();
    loader
        .spec("s", &["x", "y"], n_spec)
        .spec("s", &["x", "z"], n_spec);
    let tree = resolve(&loader, "s:*").await.unwrap();

    let root = tree.root();
    assert_eq!(root.children.len(), 1);
    let Some(TreeNode::Subtree(dir)) = root.children.get("s:x,*") else {
        panic!("missing shared directory node");
    };
    let keys: Vec<&String> = dir.children.keys().collect();
    assert_eq!(keys, vec!["s:x,y:*", "s:x,z:*"]);
    assert_eq!(tree.leaf_count(), 4);
}

#[tokio::test]
async fn test_suite1_counts() {
    let loader = suite1_loader();
    assert_eq!(count(&loader, "suite1:*").await, 8);
    assert_eq!(count(&loader, "suite1:foo,*").await, 3);
    assert_eq!(count(&loader, "suite1:foo:*").await, 3);
    assert_eq!(count(&loader, "suite1:bar,*").await, 1);
    assert_eq!(count(&loader, "suite1:bar,buzz,buzz:zap,*").await, 1);
    assert_eq!(count(&loader, "suite1:baz:*").await, 4);
    assert_eq!(count(&loader, "suite1:baz:wye:*").await, 2);
    assert_eq!(count(&loader, "suite1:baz:wye:").await, 1);
    assert_eq!(count(&loader, "suite1:baz:wye:x=1").await, 1);
    assert_eq!(count(&loader, "suite1:baz:zed:*").await, 2);
    assert_eq!(count(&loader, "suite1:baz:zed:a=1;b=2").await, 1);
    assert_eq!(count(&loader, "suite1:baz:zed:b=3;a=1").await, 1);
    assert_eq!(count(&loader, "suite1:baz:zed:a=1;*").await, 1);
    assert_eq!(count(&loader, "suite1:foo:hello:").await, 1);
}

#[tokio::test]
async fn test_order_follows_listing_and_registration() {
    let tree = resolve(&suite1_loader(), "suite1:*").await.unwrap();
    assert_eq!(
        leaf_keys(&tree),
        vec![
            "suite1:foo:hello:",
            "suite1:foo:bonjour:",
            "suite1:foo:hola:",
            "suite1:bar,buzz,buzz:zap:",
            "suite1:baz:wye:",
            "suite1:baz:wye:x=1",
            "suite1:baz:zed:a=1;b=2",
            "suite1:baz:zed:b=3;a=1",
        ]
    );
}

#[tokio::test]
async fn test_param_prefix_nodes() {
    let tree = resolve(&suite1_loader(), "suite1:baz:*").await.unwrap();
    assert!(matches!(tree.get("suite1:baz:zed:*"), Some(TreeNode::Subtree(_))));
    assert!(matches!(tree.get("suite1:baz:zed:a=1;*"), Some(TreeNode::Subtree(_))));
    assert!(matches!(tree.get("suite1:baz:zed:b=3;*"), Some(TreeNode::Subtree(_))));
    assert!(matches!(tree.get("suite1:baz:zed:a=1;b=2"), Some(TreeNode::Leaf(_))));
    assert!(tree.get("suite1:baz:zed:a=1;b=3").is_none());
}

#[tokio::test]
async fn test_test_prefix_nodes() {
    let mut loader = StaticLoader::new();
    loader.spec("s", &["f"], || {
        let mut g = TestGroup::new();
        g.test("outer,inner")?.run(pass);
        g.test("outer,other")?.run(pass);
        SpecFile::new("", g)
    });
    let tree = resolve(&loader, "s:f:outer,*").await.unwrap();
    let Some(TreeNode::Subtree(prefix)) = tree.get("s:f:outer,*") else {
        panic!("missing test prefix node");
    };
    assert_eq!(prefix.children.len(), 2);
    assert!(tree.get("s:f:outer,inner:*").is_some());
    assert_eq!(
        leaf_keys(&tree),
        vec!["s:f:outer,inner:", "s:f:outer,other:"]
    );

    let tree = resolve(&loader, "s:f:outer,inner:*").await.unwrap();
    assert_eq!(tree.leaf_count(), 1);
}

#[tokio::test]
async fn test_descriptions() {
    let tree = resolve(&suite1_loader(), "suite1:bar,buzz,*").await.unwrap();
    assert_eq!(tree.root().description.as_deref(), Some("desc 1a\ndesc 1b"));
    let Some(TreeNode::Subtree(bar)) = tree.get("suite1:bar,*") else {
        panic!("missing directory node");
    };
    assert_eq!(bar.description.as_deref(), Some("desc 1f"));
    let Some(TreeNode::Subtree(file)) = tree.get("suite1:bar,buzz,buzz:*") else {
        panic!("missing file node");
    };
    assert_eq!(file.description.as_deref(), Some("desc 1d"));
}

#[tokio::test]
async fn test_readme_beside_file() {
    let mut loader = StaticLoader::new();
    loader
        .readme("s", &["a"], "dir a")
        .spec("s", &["a"], n_spec)
        .spec("s", &["a", "b"], n_spec);

    // the file query gets no directory node of its own name
    let tree = resolve(&loader, "s:a:*").await.unwrap();
    let keys: Vec<&String> = tree.root().children.keys().collect();
    assert_eq!(keys, vec!["s:a:*"]);

    // a file below it keeps the readme on its parent directory
    let tree = resolve(&loader, "s:a,b:*").await.unwrap();
    let Some(TreeNode::Subtree(dir)) = tree.get("s:a,*") else {
        panic!("missing directory node");
    };
    assert_eq!(dir.description.as_deref(), Some("dir a"));
    assert_eq!(tree.leaf_count(), 2);

    let tree = resolve(&loader, "s:a,*").await.unwrap();
    let Some(TreeNode::Subtree(dir)) = tree.get("s:a,*") else {
        panic!("missing directory node");
    };
    assert_eq!(dir.description.as_deref(), Some("dir a"));
}

#[tokio::test]
async fn test_display() {
    let tree = resolve(&demo_loader(), "demo:a:*").await.unwrap();
    let text = tree.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "demo:*  # Demo suite.");
    assert_eq!(lines[1], "  demo:a:*  # t over n");
    assert_eq!(lines[2], "    demo:a:t:*");
    assert_eq!(lines[3], "      demo:a:t:n=1");
    assert_eq!(lines.len(), 5);
}

#[tokio::test]
async fn test_no_match() {
    let loader = suite1_loader();
    for query in [
        "suite1:nope:*",
        "suite1:foo:nope:*",
        "suite1:foo:hello:x=1",
        "suite1:baz:zed:a=1",
        "suite1:foo,hello,*",
    ] {
        match resolve(&loader, query).await {
            Err(Error::StructuralMismatch(message)) => {
                assert!(message.contains(query), "{}", message)
            }
            other => panic!("expected StructuralMismatch for {}, got {:?}", query, other),
        }
    }
}

#[tokio::test]
async fn test_malformed_query() {
    assert!(matches!(
        resolve(&suite1_loader(), "suite1:foo").await,
        Err(Error::MalformedQuery { .. })
    ));
}

struct BrokenLoader;

#[async_trait]
impl SpecLoader for BrokenLoader {
    async fn listing(&self, _suite: &str) -> Result<Vec<ListingEntry>> {
        Ok(vec![ListingEntry::spec_file(["gone"])])
    }

    async fn import_spec_file(&self, suite: &str, path: &[String]) -> Result<SpecFile> {
        Err(Error::SpecNotFound(format!("{}:{}", suite, path.join(","))))
    }
}

#[tokio::test]
async fn test_spec_not_found_propagates() {
    match resolve(&BrokenLoader, "s:*").await {
        Err(Error::SpecNotFound(path)) => assert_eq!(path, "s:gone"),
        other => panic!("expected SpecNotFound, got {:?}", other),
    }
    assert!(matches!(
        resolve(&demo_loader(), "nosuite:*").await,
        Err(Error::SpecNotFound(_))
    ));
}

#[tokio::test]
async fn test_run_leaves() {
    let mut loader = StaticLoader::new();
    loader.spec("s", &["f"], || {
        let mut g = TestGroup::new();
        g.test("even")?
            .params(poptions("n", [1, 2, 3, 4]))?
            .run(|t| {
                let n = t.param("n")?.as_f64().unwrap_or(0.0);
                t.expect(n as i64 % 2 == 0, format!("{} is odd", n));
                Ok(())
            });
        SpecFile::new("", g)
    });
    let tree = resolve(&loader, "s:*").await.unwrap();
    let mut rec = CaseRecorder::new(false);
    let statuses: Vec<Status> = tree
        .iter_leaves()
        .map(|leaf| {
            leaf.run(&mut rec, &[]);
            rec.finish().status
        })
        .collect();
    assert_eq!(statuses, vec![Status::Fail, Status::Pass, Status::Fail, Status::Pass]);
}

#[tokio::test]
async fn test_iterating_twice() {
    let tree = resolve(&demo_loader(), "demo:*").await.unwrap();
    assert_eq!(leaf_keys(&tree), leaf_keys(&tree));
    assert_eq!(tree.query().to_string(), "demo:*");
}
