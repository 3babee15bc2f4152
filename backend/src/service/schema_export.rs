//! Plain-SQL export of the database schema built from the embedded
//! migrations.

/// Embedded migrations as `(file name, sql)` in apply order.
pub const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_initial_schema.sql",
    include_str!("../../migrations/0001_initial_schema.sql"),
)];

pub fn export_schema() -> String {
    let mut out = String::from("-- Schema export\n");
    for (name, sql) in MIGRATIONS {
        out.push_str("\n-- ==== ");
        out.push_str(name);
        out.push_str(" ====\n\n");
        out.push_str(sql.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_every_migration() {
        let schema = export_schema();
        for (name, _) in MIGRATIONS {
            assert!(schema.contains(name));
        }
        assert!(schema.contains("CREATE TABLE map_veto_sessions"));
        assert!(schema.contains("CREATE TRIGGER map_veto_actions_notify"));
    }

    #[test]
    fn test_migrations_are_ordered() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|(n, _)| *n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
