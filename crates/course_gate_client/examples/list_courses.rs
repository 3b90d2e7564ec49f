use course_gate_client::{CourseApi, CourseQuery, config::Config, resilient::ResilientCourseClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads COURSE_API_BASE_URL and friends; an unreachable backend still prints bundled courses.
    let cfg = Config::from_env()?;
    let client = ResilientCourseClient::from_config(&cfg)?;

    let page = client.list_courses(&CourseQuery::default()).await?;
    let health = client.health().await;
    println!(
        "backend healthy: {} (checked {})",
        health.healthy, health.checked_at
    );
    for course in &page.items {
        println!("{:>4}  {}  ({:?})", course.id, course.title, course.level);
    }
    println!(
        "page {}/{} of {} courses",
        page.pagination.page, page.pagination.total_pages, page.pagination.total
    );
    Ok(())
}
