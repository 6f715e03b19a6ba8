//! Serving one engine from many tasks at once.

mod common;
use common::*;

use std::sync::Arc;

use oxide_dispatch::{Engine, PathTrie, Request};

const PATHS: &[&str] = &[
    "/",
    "/users",
    "/users/list",
    "/users/17",
    "/users/17/posts/3",
    "/files/a/b/c.txt",
    "/admin/stats",
    "/missing",
    "/users/",
];

fn build() -> Engine {
    let mut app = engine();
    app.get("/", |c| c.string(200, "root"));
    app.get("/users", |c| c.string(200, "users"));
    app.get("/users/list", |c| c.string(200, "list"));
    app.get("/users/:id", |c| {
        let body = format!("user {}", c.param("id").unwrap_or_default());
        c.string(200, body);
    });
    app.get("/users/:id/posts/:post", |c| {
        let body = format!(
            "post {} of {}",
            c.param("post").unwrap_or_default(),
            c.param("id").unwrap_or_default()
        );
        c.string(200, body);
    });
    app.get("/files/*path", |c| {
        let body = format!("file {}", c.param("path").unwrap_or_default());
        c.string(200, body);
    });
    {
        let mut admin = app.group("/admin");
        admin.middleware(|c| {
            c.set_header("X-Admin", "1");
            c.next();
        });
        admin.get("/stats", |c| c.string(200, "stats"));
    }
    app
}

fn snapshot(app: &Engine, path: &str) -> (u16, String) {
    let res = app.handle(Request::get(path));
    (res.status, body(&res))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_dispatch_matches_sequential() {
    let app = Arc::new(build());
    let expected: Vec<_> = PATHS.iter().map(|p| snapshot(&app, p)).collect();
    let expected = Arc::new(expected);

    let mut tasks = Vec::new();
    for worker in 0..16 {
        let app = Arc::clone(&app);
        let expected = Arc::clone(&expected);
        tasks.push(tokio::spawn(async move {
            for round in 0..200 {
                let i = (worker + round) % PATHS.len();
                assert_eq!(snapshot(&app, PATHS[i]), expected[i], "path {}", PATHS[i]);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}

#[test]
fn parallel_trie_lookups_match_sequential() {
    let mut trie = PathTrie::new();
    for (i, pattern) in ["/a/:x", "/a/list", "/a/:x/*rest", "/b/c/d"].iter().enumerate() {
        trie.insert(pattern, i);
    }
    let lookup = |trie: &PathTrie<usize>, path: &str| {
        trie.find(path)
            .map(|m| (*m.value, m.pattern.to_string(), m.params.get("x").map(str::to_string)))
    };
    let paths = ["/a/1", "/a/list", "/a/1/2/3", "/b/c/d", "/b/c", "/a"];
    let expected: Vec<_> = paths.iter().map(|p| lookup(&trie, p)).collect();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..500 {
                    for (path, want) in paths.iter().zip(&expected) {
                        assert_eq!(&lookup(&trie, path), want);
                    }
                }
            });
        }
    });
}
