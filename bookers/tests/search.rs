mod common;

use diesel::sqlite::SqliteConnection;

use bookers::{Book, SearchMode, User};

fn seed(conn: &mut SqliteConnection) {
    for name in &["alice", "alan", "malice", "bob", "al_x", "ally"] {
        common::register(conn, name);
    }
}

fn search(conn: &mut SqliteConnection, mode: &str, word: &str) -> Vec<String> {
    User::looks(conn, SearchMode::from_param(mode), word)
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect()
}

#[test]
fn perfect_match_returns_only_exact_names() {
    let mut conn = common::connection();
    seed(&mut conn);
    assert_eq!(search(&mut conn, "perfect_match", "alice"), ["alice"]);
    assert!(search(&mut conn, "perfect_match", "ali").is_empty());
}

#[test]
fn forward_backward_and_partial_match() {
    let mut conn = common::connection();
    seed(&mut conn);
    assert_eq!(
        search(&mut conn, "forward_match", "al"),
        ["alice", "alan", "al_x", "ally"]
    );
    assert_eq!(search(&mut conn, "backward_match", "ice"), ["alice", "malice"]);
    assert_eq!(
        search(&mut conn, "partial_match", "lic"),
        ["alice", "malice"]
    );
}

#[test]
fn unknown_mode_returns_everyone() {
    let mut conn = common::connection();
    seed(&mut conn);
    let all = search(&mut conn, "something_else", "alice");
    assert_eq!(all.len(), 6);
    assert_eq!(search(&mut conn, "", ""), all);
}

#[test]
fn wildcards_in_the_word_match_literally() {
    let mut conn = common::connection();
    seed(&mut conn);
    // `_` would match any single character if it were not escaped.
    assert_eq!(search(&mut conn, "forward_match", "al_"), ["al_x"]);
    assert!(search(&mut conn, "partial_match", "%").is_empty());
}

#[test]
fn matching_ignores_ascii_case() {
    let mut conn = common::connection();
    seed(&mut conn);
    assert_eq!(search(&mut conn, "perfect_match", "ALICE"), ["alice"]);
}

#[test]
fn book_titles_use_the_same_dispatcher() {
    let mut conn = common::connection();
    let alice = common::register(&mut conn, "alice");
    for title in &["Dune", "Dune Messiah", "Children of Dune", "Emma"] {
        Book::create(&mut conn, &alice, title, "body").unwrap();
    }
    let titles = |mode: SearchMode, word: &str, conn: &mut SqliteConnection| {
        Book::looks(conn, mode, word)
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect::<Vec<_>>()
    };
    assert_eq!(titles(SearchMode::PerfectMatch, "Dune", &mut conn), ["Dune"]);
    assert_eq!(
        titles(SearchMode::ForwardMatch, "Dune", &mut conn),
        ["Dune", "Dune Messiah"]
    );
    assert_eq!(
        titles(SearchMode::BackwardMatch, "Dune", &mut conn),
        ["Dune", "Children of Dune"]
    );
    assert_eq!(titles(SearchMode::PartialMatch, "une", &mut conn).len(), 3);
    assert_eq!(titles(SearchMode::All, "Dune", &mut conn).len(), 4);
}
