use devcamper_core::AppError;
use devcamper_core::models::{COURSE_FIELDS, CourseChanges, NewCourse, SkillLevel};
use devcamper_core::query::{QueryOptions, ResultQuery};
use devcamper_db::Database;
use uuid::Uuid;

use crate::integration::common::{boston, new_bootcamp, setup_test_db};

fn new_course(bootcamp_id: Uuid, title: &str, tuition: f64) -> NewCourse {
    NewCourse {
        bootcamp_id,
        title: title.to_string(),
        description: format!("{title} course"),
        weeks: "8".to_string(),
        tuition,
        minimum_skill: SkillLevel::Beginner,
        scholarship_available: false,
    }
}

fn query(pairs: &[(&str, &str)]) -> ResultQuery {
    let params: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ResultQuery::parse(&params, &COURSE_FIELDS, &QueryOptions::default()).unwrap()
}

#[tokio::test]
async fn create_course_sets_average_cost() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let camp = db
        .bootcamp_repo()
        .create(&new_bootcamp("Costly", &["Business"]), &boston())
        .await
        .unwrap();
    let courses = db.course_repo();

    let course = courses
        .create(&new_course(camp.id, "Front End", 8000.0))
        .await
        .unwrap();
    assert_eq!(course.bootcamp_id, camp.id);
    assert_eq!(course.minimum_skill, SkillLevel::Beginner);

    courses
        .create(&new_course(camp.id, "Back End", 12001.0))
        .await
        .unwrap();

    let camp = db.bootcamp_repo().get(camp.id).await.unwrap().unwrap();
    assert_eq!(camp.average_cost, Some(10010.0));
}

#[tokio::test]
async fn create_course_for_missing_bootcamp_is_not_found() {
    let (pool, _container) = setup_test_db().await;
    let courses = Database::from_pool(pool).course_repo();

    let missing = Uuid::new_v4();
    let err = courses
        .create(&new_course(missing, "Orphan", 100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { kind: "Bootcamp", .. }), "got {err:?}");
}

#[tokio::test]
async fn tuition_update_and_delete_recompute_average_cost() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let camp = db
        .bootcamp_repo()
        .create(&new_bootcamp("Shifting", &["Business"]), &boston())
        .await
        .unwrap();
    let courses = db.course_repo();

    let course = courses
        .create(&new_course(camp.id, "Only", 5000.0))
        .await
        .unwrap();

    let changes = CourseChanges {
        tuition: Some(7005.0),
        ..Default::default()
    };
    let updated = courses
        .update(course.id, &changes)
        .await
        .unwrap()
        .expect("should exist");
    assert_eq!(updated.tuition, 7005.0);
    let cost = db.bootcamp_repo().get(camp.id).await.unwrap().unwrap().average_cost;
    assert_eq!(cost, Some(7010.0));

    assert!(courses.delete(course.id).await.unwrap());
    let cost = db.bootcamp_repo().get(camp.id).await.unwrap().unwrap().average_cost;
    assert!(cost.is_none());

    assert!(!courses.delete(course.id).await.unwrap());
    assert!(courses.update(course.id, &changes).await.unwrap().is_none());
}

#[tokio::test]
async fn update_of_concurrently_deleted_course_is_none() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool.clone());
    let camp = db
        .bootcamp_repo()
        .create(&new_bootcamp("Racing", &["Business"]), &boston())
        .await
        .unwrap();
    let course = db
        .course_repo()
        .create(&new_course(camp.id, "Doomed", 1000.0))
        .await
        .unwrap();

    // Hold the bootcamp lock so the update stalls after resolving the course.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM bootcamps WHERE id = $1 FOR UPDATE")
        .bind(camp.id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let courses = db.course_repo();
    let course_id = course.id;
    let update = tokio::spawn(async move {
        let changes = CourseChanges {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        courses.update(course_id, &changes).await
    });
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course.id)
        .execute(&mut *blocker)
        .await
        .unwrap();
    blocker.commit().await.unwrap();

    let result = update.await.unwrap().expect("should not be a database error");
    assert!(result.is_none());
}

#[tokio::test]
async fn list_scopes_to_bootcamp_and_filters() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let first = db
        .bootcamp_repo()
        .create(&new_bootcamp("First", &["Business"]), &boston())
        .await
        .unwrap();
    let second = db
        .bootcamp_repo()
        .create(&new_bootcamp("Second", &["Business"]), &boston())
        .await
        .unwrap();
    let courses = db.course_repo();

    courses.create(&new_course(first.id, "Cheap", 500.0)).await.unwrap();
    courses.create(&new_course(first.id, "Pricey", 15000.0)).await.unwrap();
    courses.create(&new_course(second.id, "Other", 9000.0)).await.unwrap();

    let all = courses.list(&query(&[]), None).await.unwrap();
    assert_eq!(all.total, 3);

    let scoped = courses.list(&query(&[]), Some(first.id)).await.unwrap();
    assert_eq!(scoped.total, 2);
    assert!(scoped.items.iter().all(|c| c.bootcamp_id == first.id));

    let filtered = courses
        .list(&query(&[("tuition[gte]", "1000")]), Some(first.id))
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.items[0].title, "Pricey");

    let grouped = courses.for_bootcamps(&[first.id, second.id]).await.unwrap();
    assert_eq!(grouped.len(), 3);
}

#[tokio::test]
async fn deleting_bootcamp_cascades_to_courses() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let camp = db
        .bootcamp_repo()
        .create(&new_bootcamp("Doomed", &["Business"]), &boston())
        .await
        .unwrap();
    let course = db
        .course_repo()
        .create(&new_course(camp.id, "Gone", 100.0))
        .await
        .unwrap();

    assert!(db.bootcamp_repo().delete(camp.id).await.unwrap());
    assert!(db.course_repo().get(course.id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_all_clears_courses_and_costs() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let camp = db
        .bootcamp_repo()
        .create(&new_bootcamp("Reset", &["Business"]), &boston())
        .await
        .unwrap();
    db.course_repo()
        .create(&new_course(camp.id, "A", 100.0))
        .await
        .unwrap();

    assert_eq!(db.course_repo().delete_all().await.unwrap(), 1);
    let camp = db.bootcamp_repo().get(camp.id).await.unwrap().unwrap();
    assert!(camp.average_cost.is_none());
    db.health_check().await.unwrap();
}
