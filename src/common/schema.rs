/// A column of a table under creation. `type_expr` is the literal Oracle
/// type clause, e.g. `NUMBER(10, 0) NOT NULL` or `VARCHAR2(180 BYTE)`.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub name: String,
    pub type_expr: String,
    pub auto_increment: bool,
    pub comment: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: &str, type_expr: &str) -> Self {
        ColumnDefinition {
            name: name.to_string(),
            type_expr: type_expr.to_string(),
            auto_increment: false,
            comment: None,
        }
    }

    /// Marks the column as an emulated identity column. The engine backs it
    /// with a sequence and a BEFORE INSERT trigger when the table is created.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

pub fn build_create_table_sql(table: &str, columns: &[ColumnDefinition]) -> String {
    let rendered = columns
        .iter()
        .map(|column| format!("\"{}\" {}", column.name, column.type_expr))
        .collect::<Vec<String>>()
        .join(", ");

    format!("CREATE TABLE \"{}\" ({})", table, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_columns_in_declaration_order() {
        let columns = vec![
            ColumnDefinition::new("ID", "NUMBER(10, 0) NOT NULL").auto_increment(),
            ColumnDefinition::new("NAME", "VARCHAR2(50 BYTE)").comment("display name"),
        ];

        assert_eq!(
            build_create_table_sql("ACCOUNTS", &columns),
            "CREATE TABLE \"ACCOUNTS\" (\"ID\" NUMBER(10, 0) NOT NULL, \"NAME\" VARCHAR2(50 BYTE))"
        );
    }
}
