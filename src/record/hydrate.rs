//! Populating records from result rows.

use super::Record;
use crate::error::DbResult;
use crate::models::Row;

/// Copy every bound column of `row` into `record`.
///
/// Columns without a bound field are discarded. The first value that does not fit
/// its field stops hydration with a decode error; fields written before it keep
/// their new values.
pub fn hydrate<R: Record>(record: &mut R, row: &Row) -> DbResult<()> {
    let schema = R::schema();
    for (name, value) in row.iter() {
        if let Some(column) = schema.column(name) {
            column.write(record, value.clone())?;
        }
    }
    Ok(())
}

/// Build a fresh record from `row`.
pub fn hydrate_new<R: Record>(row: &Row) -> DbResult<R> {
    let mut record = R::default();
    hydrate(&mut record, row)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::impl_record;
    use crate::models::Value;

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        id: i64,
        email: String,
        nickname: Option<String>,
    }

    impl_record! {
        Account {
            #[id] id => "id,nullempty",
            email => "email",
            nickname => "nickname",
        }
    }

    #[test]
    fn test_hydrate_maps_and_discards() {
        let row = Row::from_pairs([
            ("id", Value::Int(5)),
            ("email", Value::from("a@b.c")),
            ("created_at_server", Value::from("ignored")),
            ("nickname", Value::NULL),
        ]);
        let account: Account = hydrate_new(&row).unwrap();
        assert_eq!(
            account,
            Account {
                id: 5,
                email: "a@b.c".into(),
                nickname: None,
            }
        );
    }

    #[test]
    fn test_hydrate_type_mismatch_fails() {
        let row = Row::from_pairs([("id", Value::from("five"))]);
        let mut account = Account::default();
        let err = hydrate(&mut account, &row).unwrap_err();
        assert!(matches!(err, DbError::Decode { ref column, .. } if column == "id"));
    }

    #[test]
    fn test_hydrate_null_into_required_field_fails() {
        let row = Row::from_pairs([("email", Value::NULL)]);
        let mut account = Account::default();
        assert!(hydrate(&mut account, &row).is_err());
    }
}
