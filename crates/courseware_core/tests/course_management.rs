use courseware_core::db::open_db_in_memory;
use courseware_core::{
    CourseForm, CourseRepository, CourseService, CourseServiceError, ModuleForm,
    SqliteCourseRepository, SqliteSubjectRepository, SqliteUserRepository, Subject,
    SubjectRepository, User, UserRepository, ValidationError,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed(conn: &Connection) -> (User, User, Subject) {
    let users = SqliteUserRepository::new(conn);
    let owner = User::new("admin", "admin@example.com");
    let other = User::new("other", "other@example.com");
    users.create_user(&owner).unwrap();
    users.create_user(&other).unwrap();
    let subject = Subject::new("Programming", "programming");
    SqliteSubjectRepository::new(conn)
        .create_subject(&subject)
        .unwrap();
    (owner, other, subject)
}

fn course_form(subject: &Subject, title: &str, slug: &str) -> CourseForm {
    CourseForm {
        subject_id: subject.id,
        title: title.to_string(),
        slug: slug.to_string(),
        overview: format!("All about {title}"),
    }
}

#[test]
fn manage_list_shows_only_own_courses_newest_first() {
    let conn = setup();
    let (owner, other, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));

    service
        .create_course(owner.id, course_form(&subject, "Course 1", "course-1"))
        .unwrap();
    service
        .create_course(owner.id, course_form(&subject, "Course 3", "course-3"))
        .unwrap();
    service
        .create_course(other.id, course_form(&subject, "Foreign", "foreign"))
        .unwrap();
    service
        .create_course(owner.id, course_form(&subject, "Course 2", "course-2"))
        .unwrap();

    let titles: Vec<String> = service
        .manage_course_list(owner.id)
        .unwrap()
        .into_iter()
        .map(|course| course.title)
        .collect();
    assert_eq!(titles, ["Course 2", "Course 3", "Course 1"]);
}

#[test]
fn create_course_rejects_duplicate_and_malformed_slugs() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));

    let created = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();
    assert_eq!(created.owner_id, owner.id);
    assert!(created.created_at > 0);

    let err = service
        .create_course(owner.id, course_form(&subject, "Rust again", "rust"))
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::SlugTaken(slug) if slug == "rust"));

    let derived = service
        .create_course(owner.id, course_form(&subject, "Rust: The Hard Parts!", "  "))
        .unwrap();
    assert_eq!(derived.slug, "rust-the-hard-parts");

    let err = service
        .create_course(owner.id, course_form(&subject, "Rust", ""))
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::SlugTaken(slug) if slug == "rust"));

    let err = service
        .create_course(owner.id, course_form(&subject, "Bad", "bad slug"))
        .unwrap_err();
    assert!(matches!(
        err,
        CourseServiceError::Validation(ValidationError::InvalidSlug(_))
    ));
}

#[test]
fn other_instructors_cannot_touch_a_course() {
    let conn = setup();
    let (owner, other, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();

    let err = service
        .update_course(other.id, course.id, course_form(&subject, "Hijack", "rust"))
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::CourseNotFound(id) if id == course.id));

    let err = service.delete_course(other.id, course.id).unwrap_err();
    assert!(matches!(err, CourseServiceError::CourseNotFound(_)));

    let err = service
        .add_module(other.id, course.id, "Sneaky", "", None)
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::CourseNotFound(_)));
}

#[test]
fn update_course_keeps_own_slug_and_changes_fields() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();

    let updated = service
        .update_course(owner.id, course.id, course_form(&subject, "Rust 2024", "rust"))
        .unwrap();
    assert_eq!(updated.title, "Rust 2024");
    assert_eq!(updated.created_at, course.created_at);
}

#[test]
fn add_module_appends_unless_position_given() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();

    let intro = service
        .add_module(owner.id, course.id, "Intro", "Getting started", None)
        .unwrap();
    let pinned = service
        .add_module(owner.id, course.id, "Pinned", "", Some(4))
        .unwrap();
    let next = service
        .add_module(owner.id, course.id, "Next", "", None)
        .unwrap();

    assert_eq!(intro.position, 0);
    assert_eq!(intro.description, "Getting started");
    assert_eq!(pinned.position, 4);
    assert_eq!(next.position, 5);

    let err = service
        .add_module(owner.id, course.id, "   ", "", None)
        .unwrap_err();
    assert!(matches!(
        err,
        CourseServiceError::Validation(ValidationError::Blank("title"))
    ));
}

#[test]
fn module_formset_edits_deletes_and_appends() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();
    let first = service
        .add_module(owner.id, course.id, "First", "", None)
        .unwrap();
    let second = service
        .add_module(owner.id, course.id, "Second", "", None)
        .unwrap();
    let third = service
        .add_module(owner.id, course.id, "Third", "", None)
        .unwrap();

    let modules = service
        .update_modules(
            owner.id,
            course.id,
            vec![
                ModuleForm::existing(first.id, "First, revised", "now with notes"),
                ModuleForm::deleting(second.id),
                ModuleForm::existing(third.id, "Third", ""),
                ModuleForm::new("Fourth", "added by formset"),
                ModuleForm::new("", ""),
            ],
        )
        .unwrap();

    let summary: Vec<(String, i64)> = modules
        .iter()
        .map(|module| (module.title.clone(), module.position))
        .collect();
    assert_eq!(
        summary,
        [
            ("First, revised".to_string(), 0),
            ("Third".to_string(), 2),
            ("Fourth".to_string(), 3),
        ]
    );
    assert_eq!(modules[0].description, "now with notes");
}

#[test]
fn module_formset_is_atomic() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();
    let first = service
        .add_module(owner.id, course.id, "First", "", None)
        .unwrap();

    let err = service
        .update_modules(
            owner.id,
            course.id,
            vec![
                ModuleForm::existing(first.id, "Renamed", ""),
                ModuleForm::deleting(uuid::Uuid::new_v4()),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::ModuleNotFound(_)));

    let modules = service.course_modules(owner.id, course.id).unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].title, "First");
}

#[test]
fn reorder_modules_writes_explicit_positions() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();
    let a = service.add_module(owner.id, course.id, "A", "", None).unwrap();
    let b = service.add_module(owner.id, course.id, "B", "", None).unwrap();
    let c = service.add_module(owner.id, course.id, "C", "", None).unwrap();

    let modules = service
        .reorder_modules(owner.id, course.id, &[(c.id, 0), (a.id, 1), (b.id, 2)])
        .unwrap();
    let titles: Vec<&str> = modules.iter().map(|module| module.title.as_str()).collect();
    assert_eq!(titles, ["C", "A", "B"]);

    let next = service.add_module(owner.id, course.id, "D", "", None).unwrap();
    assert_eq!(next.position, 3);
}

#[test]
fn deleting_a_course_removes_its_modules() {
    let conn = setup();
    let (owner, _, subject) = seed(&conn);
    let service = CourseService::new(SqliteCourseRepository::new(&conn));
    let course = service
        .create_course(owner.id, course_form(&subject, "Rust", "rust"))
        .unwrap();
    let module = service
        .add_module(owner.id, course.id, "Intro", "", None)
        .unwrap();

    service.delete_course(owner.id, course.id).unwrap();

    let repo = SqliteCourseRepository::new(&conn);
    assert!(repo.get_course(course.id).unwrap().is_none());
    assert!(repo.get_module(module.id).unwrap().is_none());
}
