use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
    #[default]
    None,
}

impl Role {
    /// The student flag wins when both are set.
    pub fn from_flags(student: bool, staff: bool) -> Self {
        if student {
            Role::Student
        } else if staff {
            Role::Staff
        } else {
            Role::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
            Role::None => "none",
        }
    }
}

/// A character as returned by the character API, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRecord {
    pub name: String,
    pub house: Option<String>,
    pub species: Option<String>,
    pub role: Role,
    pub patronus: Option<String>,
    pub gender: Option<String>,
    pub year_of_birth: Option<i64>,
    pub alternate_names: Vec<String>,
}

impl CharacterRecord {
    #[cfg(test)]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            house: None,
            species: None,
            role: Role::None,
            patronus: None,
            gender: None,
            year_of_birth: None,
            alternate_names: Vec::new(),
        }
    }
}

/// A character row, shaped the same in the source store and the combined store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub name: String,
    pub house: Option<String>,
    pub species: Option<String>,
    pub role: Option<String>,
    pub patronus: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub alternate_names: Option<String>,
}

impl NewCharacter {
    pub fn from_record(record: CharacterRecord) -> serde_json::Result<Self> {
        Ok(Self {
            alternate_names: Some(serde_json::to_string(&record.alternate_names)?),
            name: record.name,
            house: record.house,
            species: record.species,
            role: Some(record.role.as_str().to_string()),
            patronus: record.patronus,
            gender: record.gender,
            age: record.year_of_birth,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub house: Option<String>,
    pub species: Option<String>,
    pub role: Option<String>,
    pub patronus: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub alternate_names: Option<String>,
}

impl Character {
    pub fn into_new(self) -> NewCharacter {
        NewCharacter {
            name: self.name,
            house: self.house,
            species: self.species,
            role: self.role,
            patronus: self.patronus,
            gender: self.gender,
            age: self.age,
            alternate_names: self.alternate_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_prefers_student_then_staff() {
        assert_eq!(Role::from_flags(true, false), Role::Student);
        assert_eq!(Role::from_flags(true, true), Role::Student);
        assert_eq!(Role::from_flags(false, true), Role::Staff);
        assert_eq!(Role::from_flags(false, false), Role::None);
        assert_eq!(Role::Staff.as_str(), "staff");
    }

    #[test]
    fn record_serializes_alternate_names_as_json() {
        let mut record = CharacterRecord::named("Harry Potter");
        record.alternate_names = vec!["The Boy Who Lived".into(), "The Chosen One".into()];
        record.role = Role::Student;
        record.year_of_birth = Some(1980);

        let row = NewCharacter::from_record(record).unwrap();
        assert_eq!(
            row.alternate_names.as_deref(),
            Some(r#"["The Boy Who Lived","The Chosen One"]"#)
        );
        assert_eq!(row.role.as_deref(), Some("student"));
        assert_eq!(row.age, Some(1980));
    }
}
