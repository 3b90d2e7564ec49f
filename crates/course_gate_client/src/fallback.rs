//! Bundled substitute data served while the backend is unavailable.
//!
//! Every answer has the same shape as the live endpoint's, so callers never
//! need to know where the data came from.

use chrono::{DateTime, Utc};

use crate::pagination::paginate;
use crate::{Category, Course, CourseApiError, CourseLevel, CourseQuery, Instructor, Paginated};

#[derive(Clone, Debug)]
pub struct FallbackDataProvider {
    courses: Vec<Course>,
    categories: Vec<Category>,
}

impl Default for FallbackDataProvider {
    fn default() -> Self {
        Self::bundled()
    }
}

impl FallbackDataProvider {
    pub fn new(courses: Vec<Course>, categories: Vec<Category>) -> Self {
        Self {
            courses,
            categories,
        }
    }

    /// The dataset shipped with the crate.
    pub fn bundled() -> Self {
        Self::new(bundled_courses(), bundled_categories())
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    /// One page of courses matching `query`'s filters.
    pub fn courses(&self, query: &CourseQuery) -> Paginated<Course> {
        let mut q = query.normalized();
        q.category = q.category.map(|c| self.category_slug(&c));
        let matching: Vec<Course> = self
            .courses
            .iter()
            .filter(|c| matches_query(c, &q))
            .cloned()
            .collect();
        paginate(&matching, q.page, q.limit)
    }

    /// Map a category name to its slug; anything else is taken as a slug already.
    fn category_slug(&self, name_or_slug: &str) -> String {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name_or_slug))
            .map(|c| c.slug.clone())
            .unwrap_or_else(|| name_or_slug.to_string())
    }

    pub fn course_by_id(&self, id: &str) -> Result<Course, CourseApiError> {
        self.courses
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CourseApiError::course_not_found(id))
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.clone()
    }

    pub fn featured_courses(&self, limit: u32) -> Vec<Course> {
        self.courses
            .iter()
            .filter(|c| c.is_featured)
            .take(limit as usize)
            .cloned()
            .collect()
    }
}

fn matches_query(course: &Course, q: &CourseQuery) -> bool {
    if let Some(cat) = q.category.as_deref() {
        if !course.category.eq_ignore_ascii_case(cat) {
            return false;
        }
    }
    if let Some(level) = &q.level {
        if &course.level != level {
            return false;
        }
    }
    if let Some(featured) = q.featured {
        if course.is_featured != featured {
            return false;
        }
    }
    if let Some(search) = q.search.as_deref() {
        let needle = search.to_lowercase();
        let hit = course.title.to_lowercase().contains(&needle)
            || course.description.to_lowercase().contains(&needle)
            || course
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    true
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

fn bundled_courses() -> Vec<Course> {
    vec![
        Course {
            id: "1".into(),
            title: "Complete Web Development Bootcamp".into(),
            slug: "complete-web-development-bootcamp".into(),
            description: "Learn HTML, CSS, JavaScript, React and Node.js by building real projects from scratch.".into(),
            short_description: Some("Full-stack web development from zero to deployment.".into()),
            instructor: Instructor {
                id: "101".into(),
                name: "Sarah Johnson".into(),
                avatar: Some("/images/instructors/sarah-johnson.jpg".into()),
                title: Some("Senior Full-Stack Engineer".into()),
            },
            category: "web-development".into(),
            level: CourseLevel::Beginner,
            price: 89.99,
            original_price: Some(199.99),
            currency: "USD".into(),
            rating: 4.8,
            reviews_count: 2340,
            students_count: 15420,
            duration_hours: 42.5,
            lessons_count: 186,
            thumbnail: Some("/images/courses/web-development.jpg".into()),
            tags: vec!["html".into(), "css".into(), "javascript".into(), "react".into()],
            is_featured: true,
            created_at: at(1_705_276_800),
            updated_at: at(1_717_200_000),
        },
        Course {
            id: "2".into(),
            title: "Data Science with Python".into(),
            slug: "data-science-with-python".into(),
            description: "Analyse data with pandas and NumPy, visualise it, and train your first machine learning models.".into(),
            short_description: Some("Practical data analysis and machine learning.".into()),
            instructor: Instructor {
                id: "102".into(),
                name: "Michael Chen".into(),
                avatar: Some("/images/instructors/michael-chen.jpg".into()),
                title: Some("Data Scientist".into()),
            },
            category: "data-science".into(),
            level: CourseLevel::Intermediate,
            price: 119.99,
            original_price: Some(249.99),
            currency: "USD".into(),
            rating: 4.7,
            reviews_count: 1875,
            students_count: 9830,
            duration_hours: 36.0,
            lessons_count: 142,
            thumbnail: Some("/images/courses/data-science.jpg".into()),
            tags: vec!["python".into(), "pandas".into(), "machine learning".into()],
            is_featured: true,
            created_at: at(1_707_955_200),
            updated_at: at(1_719_792_000),
        },
        Course {
            id: "3".into(),
            title: "UI/UX Design Fundamentals".into(),
            slug: "ui-ux-design-fundamentals".into(),
            description: "Master user research, wireframing and prototyping, and design interfaces people enjoy using.".into(),
            short_description: None,
            instructor: Instructor {
                id: "103".into(),
                name: "Emily Rodriguez".into(),
                avatar: None,
                title: Some("Product Designer".into()),
            },
            category: "design".into(),
            level: CourseLevel::AllLevels,
            price: 69.99,
            original_price: None,
            currency: "USD".into(),
            rating: 4.6,
            reviews_count: 980,
            students_count: 6210,
            duration_hours: 18.5,
            lessons_count: 74,
            thumbnail: Some("/images/courses/ui-ux-design.jpg".into()),
            tags: vec!["figma".into(), "prototyping".into(), "design".into()],
            is_featured: false,
            created_at: at(1_710_460_800),
            updated_at: at(1_714_521_600),
        },
    ]
}

fn bundled_categories() -> Vec<Category> {
    let cat = |id: &str, name: &str, slug: &str, icon: &str, courses_count: u32| Category {
        id: id.into(),
        name: name.into(),
        slug: slug.into(),
        description: None,
        icon: Some(icon.into()),
        courses_count,
    };
    vec![
        cat("1", "Web Development", "web-development", "code", 1),
        cat("2", "Data Science", "data-science", "chart", 1),
        cat("3", "Design", "design", "palette", 1),
        cat("4", "Business", "business", "briefcase", 0),
    ]
}
