//! Column-role resolution.
//!
//! The export's header labels drift between runs (spacing, punctuation,
//! Korean vs. English), so each canonical role carries an ordered list of
//! known labels. The first label present in a table wins.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AppError;
use crate::models::CourseTable;

/// Canonical course attribute the resolver tries to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    CourseName,
    CourseCode,
    ClassNo,
    Dept,
    Major,
    Professor,
    Credits,
    Language,
    Campus,
    Schedule,
    Capacity,
    Enrolled,
    Remaining,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::CourseName,
        Role::CourseCode,
        Role::ClassNo,
        Role::Dept,
        Role::Major,
        Role::Professor,
        Role::Credits,
        Role::Language,
        Role::Campus,
        Role::Schedule,
        Role::Capacity,
        Role::Enrolled,
        Role::Remaining,
    ];

    /// Known labels for this role, highest priority first.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Role::CourseName => &["교과목명", "과목명", "강좌명", "Subject", "Course Name", "교과목 명"],
            Role::CourseCode => &[
                "교과목번호",
                "교과목번호(학수번호)",
                "학수번호",
                "Subject Code",
                "Course Code",
                "교과목 번호",
            ],
            Role::ClassNo => &["강좌번호", "강좌 번호", "분반", "분반번호", "Class No", "Section"],
            Role::Dept => &["개설학과", "개설학부", "개설부서", "학과", "Department", "개설학과(부)"],
            Role::Major => &["전공", "전공명", "Major"],
            Role::Professor => &["담당교수", "교수명", "교수", "Professor", "Instructor"],
            Role::Credits => &["학점", "학점수", "Credits"],
            Role::Language => &["강의언어", "언어", "Language"],
            Role::Campus => &["캠퍼스", "Campus"],
            Role::Schedule => &[
                "강의시간",
                "수업시간",
                "강의시간/강의실",
                "강의시간/강의실(비대면 포함)",
                "Time",
                "Schedule",
            ],
            Role::Capacity => &["정원", "수강정원", "수강정원(정원)", "Capacity"],
            Role::Enrolled => &["신청인원", "수강신청인원", "수강인원", "Enrolled", "Applied"],
            Role::Remaining => &["잔여", "잔여석", "여석", "Remaining", "Seats Left"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::CourseName => "course_name",
            Role::CourseCode => "course_code",
            Role::ClassNo => "class_no",
            Role::Dept => "dept",
            Role::Major => "major",
            Role::Professor => "professor",
            Role::Credits => "credits",
            Role::Language => "language",
            Role::Campus => "campus",
            Role::Schedule => "schedule",
            Role::Capacity => "capacity",
            Role::Enrolled => "enrolled",
            Role::Remaining => "remaining",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("unknown column role '{s}'")))
    }
}

/// Concrete label per role for one fetched table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub class_no: Option<String>,
    pub dept: Option<String>,
    pub major: Option<String>,
    pub professor: Option<String>,
    pub credits: Option<String>,
    pub language: Option<String>,
    pub campus: Option<String>,
    pub schedule: Option<String>,
    pub capacity: Option<String>,
    pub enrolled: Option<String>,
    pub remaining: Option<String>,
}

impl ColumnMap {
    /// Resolve every role against a set of header labels.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let find = |role: Role| {
            role.candidates()
                .iter()
                .find(|c| headers.iter().any(|h| h.as_ref() == **c))
                .map(|c| c.to_string())
        };

        Self {
            course_name: find(Role::CourseName),
            course_code: find(Role::CourseCode),
            class_no: find(Role::ClassNo),
            dept: find(Role::Dept),
            major: find(Role::Major),
            professor: find(Role::Professor),
            credits: find(Role::Credits),
            language: find(Role::Language),
            campus: find(Role::Campus),
            schedule: find(Role::Schedule),
            capacity: find(Role::Capacity),
            enrolled: find(Role::Enrolled),
            remaining: find(Role::Remaining),
        }
    }

    /// Mapped label for a role, if any.
    pub fn get(&self, role: Role) -> Option<&str> {
        let label = match role {
            Role::CourseName => &self.course_name,
            Role::CourseCode => &self.course_code,
            Role::ClassNo => &self.class_no,
            Role::Dept => &self.dept,
            Role::Major => &self.major,
            Role::Professor => &self.professor,
            Role::Credits => &self.credits,
            Role::Language => &self.language,
            Role::Campus => &self.campus,
            Role::Schedule => &self.schedule,
            Role::Capacity => &self.capacity,
            Role::Enrolled => &self.enrolled,
            Role::Remaining => &self.remaining,
        };
        label.as_deref()
    }

    /// Number of roles that resolved to a column.
    pub fn mapped_count(&self) -> usize {
        Role::ALL.iter().filter(|r| self.get(**r).is_some()).count()
    }
}

/// Guess the column map for a fetched table.
pub fn guess_columns(table: &CourseTable) -> ColumnMap {
    ColumnMap::resolve(table.headers())
}
