use courseware_core::db::{open_db, open_db_in_memory, DbError};
use courseware_core::{
    ContentItem, ContentRepository, Course, CourseRepository, ItemBody, Module, NewContent,
    NewModule, RepoError, SqliteContentRepository, SqliteCourseRepository,
    SqliteSubjectRepository, SqliteUserRepository, Subject, SubjectRepository, User,
    UserRepository,
};
use rusqlite::Connection;
use std::path::Path;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed_owner(conn: &Connection) -> (User, Subject) {
    let user = User::new("instructor", "instructor@example.com");
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    let subject = Subject::new("Programming", "programming");
    SqliteSubjectRepository::new(conn)
        .create_subject(&subject)
        .unwrap();
    (user, subject)
}

fn create_course(conn: &Connection, owner: &User, subject: &Subject, slug: &str) -> Course {
    let course = Course::new(owner.id, subject.id, slug.to_uppercase(), slug, "");
    SqliteCourseRepository::new(conn)
        .create_course(&course)
        .unwrap()
}

fn add_module(conn: &Connection, course: &Course, title: &str, position: Option<i64>) -> Module {
    let mut draft = NewModule::new(course.id, title);
    draft.position = position;
    SqliteCourseRepository::new(conn)
        .create_module(&mut draft)
        .unwrap()
}

#[test]
fn modules_follow_max_plus_one_per_course() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course_one = create_course(&conn, &owner, &subject, "course-1");

    let module_a = add_module(&conn, &course_one, "A", None);
    assert_eq!(module_a.position, 0);

    let module_b = add_module(&conn, &course_one, "B", None);
    assert_eq!(module_b.position, 1);

    let module_c = add_module(&conn, &course_one, "C", Some(4));
    assert_ne!(module_c.position, 2);
    assert_eq!(module_c.position, 4);

    let module_d = add_module(&conn, &course_one, "D", None);
    assert_eq!(module_d.position, 5);

    let course_two = create_course(&conn, &owner, &subject, "course-2");
    let module_e = add_module(&conn, &course_two, "E", None);
    assert_eq!(module_e.position, 0);
}

#[test]
fn assigned_position_is_stored_and_listed_in_order() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");
    let repo = SqliteCourseRepository::new(&conn);

    add_module(&conn, &course, "Third", Some(10));
    add_module(&conn, &course, "First", Some(0));
    add_module(&conn, &course, "Fourth", None);
    add_module(&conn, &course, "Second", Some(3));

    let listed = repo.list_modules(course.id).unwrap();
    let titles: Vec<&str> = listed.iter().map(|module| module.title.as_str()).collect();
    assert_eq!(titles, ["First", "Second", "Third", "Fourth"]);
    let positions: Vec<i64> = listed.iter().map(|module| module.position).collect();
    assert_eq!(positions, [0, 3, 10, 11]);

    let reloaded = repo.get_module(listed[3].id).unwrap().unwrap();
    assert_eq!(reloaded.position, 11);
    assert_eq!(reloaded.to_string(), "11. Fourth");
}

#[test]
fn explicit_duplicate_position_is_kept_and_ties_break_by_id() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");

    let first = add_module(&conn, &course, "One", Some(4));
    let second = add_module(&conn, &course, "Two", Some(4));
    assert_eq!(first.position, 4);
    assert_eq!(second.position, 4);

    let listed = SqliteCourseRepository::new(&conn)
        .list_modules(course.id)
        .unwrap();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(
        listed.iter().map(|module| module.id).collect::<Vec<_>>(),
        expected
    );

    let next = add_module(&conn, &course, "Three", None);
    assert_eq!(next.position, 5);
}

#[test]
fn next_position_tracks_current_max_after_deletes() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");
    let repo = SqliteCourseRepository::new(&conn);

    add_module(&conn, &course, "A", None);
    add_module(&conn, &course, "B", None);
    let last = add_module(&conn, &course, "C", None);
    let middle = repo.list_modules(course.id).unwrap()[1].clone();
    repo.delete_module(middle.id).unwrap();

    let next = add_module(&conn, &course, "D", None);
    assert_eq!(next.position, 3);

    repo.delete_module(last.id).unwrap();
    repo.delete_module(next.id).unwrap();
    let after_tail_delete = add_module(&conn, &course, "E", None);
    assert_eq!(after_tail_delete.position, 1);
}

#[test]
fn updating_a_module_keeps_its_position() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");
    let repo = SqliteCourseRepository::new(&conn);

    add_module(&conn, &course, "A", None);
    let mut module = add_module(&conn, &course, "B", Some(7));
    module.title = "B renamed".to_string();
    module.position = 0;
    repo.update_module(&module).unwrap();

    let reloaded = repo.get_module(module.id).unwrap().unwrap();
    assert_eq!(reloaded.title, "B renamed");
    assert_eq!(reloaded.position, 7);
}

#[test]
fn content_positions_are_scoped_per_module() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");
    let module_one = add_module(&conn, &course, "One", None);
    let module_two = add_module(&conn, &course, "Two", None);
    let repo = SqliteContentRepository::new(&conn);

    let mut positions = Vec::new();
    for (module, explicit) in [
        (&module_one, None),
        (&module_one, None),
        (&module_one, Some(4)),
        (&module_two, None),
        (&module_one, None),
    ] {
        let item = repo
            .create_item(&ContentItem::new(
                owner.id,
                "Notes",
                ItemBody::Text {
                    content: "body".to_string(),
                },
            ))
            .unwrap();
        let draft = NewContent::for_item(module.id, &item);
        let mut draft = match explicit {
            Some(position) => draft.at_position(position),
            None => draft,
        };
        positions.push(repo.create_content(&mut draft).unwrap().position);
    }

    assert_eq!(positions, [0, 1, 4, 0, 5]);
}

#[test]
fn explicit_content_position_may_collide_with_a_sibling() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");
    let module = add_module(&conn, &course, "One", None);
    let repo = SqliteContentRepository::new(&conn);

    let mut ids = Vec::new();
    for explicit in [None, None, Some(1)] {
        let item = repo
            .create_item(&ContentItem::new(
                owner.id,
                "Notes",
                ItemBody::Text {
                    content: "body".to_string(),
                },
            ))
            .unwrap();
        let mut draft = NewContent::for_item(module.id, &item);
        if let Some(position) = explicit {
            draft = draft.at_position(position);
        }
        let content = repo.create_content(&mut draft).unwrap();
        assert_eq!(draft.position, Some(content.position));
        ids.push(content.id);
    }

    let listed: Vec<(i64, uuid::Uuid)> = repo
        .list_contents(module.id)
        .unwrap()
        .iter()
        .map(|content| (content.position, content.id))
        .collect();
    let mut tied = vec![ids[1], ids[2]];
    tied.sort();
    assert_eq!(listed, [(0, ids[0]), (1, tied[0]), (1, tied[1])]);
}

#[test]
fn module_after_max_i64_sibling_reports_overflow() {
    let conn = setup();
    let (owner, subject) = seed_owner(&conn);
    let course = create_course(&conn, &owner, &subject, "course-1");
    add_module(&conn, &course, "Last", Some(i64::MAX));

    let mut draft = NewModule::new(course.id, "After");
    let err = SqliteCourseRepository::new(&conn)
        .create_module(&mut draft)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Db(DbError::PositionOverflow { table: "modules" })
    ));
    assert_eq!(
        SqliteCourseRepository::new(&conn)
            .list_modules(course.id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn missing_course_is_reported_before_position_lookup() {
    let conn = setup();
    let mut draft = NewModule::new(uuid::Uuid::new_v4(), "Orphan");
    let err = SqliteCourseRepository::new(&conn)
        .create_module(&mut draft)
        .unwrap_err();
    assert!(err.to_string().contains("course not found"));
    assert_eq!(draft.position, None);
}

#[test]
fn concurrent_creators_never_share_a_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let course_id = {
        let conn = open_db(&path).unwrap();
        let (owner, subject) = seed_owner(&conn);
        create_course(&conn, &owner, &subject, "course-1").id
    };

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let path = path.clone();
            std::thread::spawn(move || create_many(&path, course_id, worker))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let mut positions: Vec<i64> = SqliteCourseRepository::new(&conn)
        .list_modules(course_id)
        .unwrap()
        .into_iter()
        .map(|module| module.position)
        .collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..40).collect::<Vec<i64>>());
}

fn create_many(path: &Path, course_id: uuid::Uuid, worker: usize) {
    let conn = open_db(path).unwrap();
    let repo = SqliteCourseRepository::new(&conn);
    for index in 0..10 {
        let mut draft = NewModule::new(course_id, format!("worker {worker} module {index}"));
        repo.create_module(&mut draft).unwrap();
    }
}
