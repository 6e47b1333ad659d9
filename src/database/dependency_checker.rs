use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{DbError, DbResult};

/// Checks for foreign key dependencies before a hard delete.
///
/// The relationship map is static and must reflect the schema: repositories
/// consult it so that a delete is refused with the list of dependent tables
/// instead of failing on a constraint error deep inside SQLite.
pub struct DependencyChecker {
    pool: SqlitePool,
}

impl DependencyChecker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Tables holding foreign keys to the given table, with the referencing column.
    fn dependent_links(table_name: &str) -> &'static [(&'static str, &'static str)] {
        match table_name {
            "buildings" => &[("properties", "building_id")],
            "properties" => &[("leases", "property_id")],
            "tenants" => &[("leases", "tenant_id")],
            _ => &[],
        }
    }

    /// Count dependent records per referencing table. Tables with no
    /// dependents are omitted from the result.
    pub async fn check_dependencies(
        &self,
        table_name: &str,
        id: Uuid,
    ) -> DbResult<HashMap<String, i64>> {
        let mut dependencies = HashMap::new();

        for (table, column) in Self::dependent_links(table_name) {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                table, column
            ))
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

            if count > 0 {
                dependencies.insert(table.to_string(), count);
            }
        }

        Ok(dependencies)
    }

    /// Flat, sorted list of table names with dependent records.
    pub async fn dependency_table_names(
        &self,
        table_name: &str,
        id: Uuid,
    ) -> DbResult<Vec<String>> {
        let dependencies = self.check_dependencies(table_name, id).await?;
        let mut names: Vec<String> = dependencies.into_keys().collect();
        names.sort();
        Ok(names)
    }

    /// Check if a record can be safely hard deleted.
    pub async fn can_hard_delete(&self, table_name: &str, id: Uuid) -> DbResult<bool> {
        let dependencies = self.check_dependencies(table_name, id).await?;
        Ok(dependencies.is_empty())
    }
}
