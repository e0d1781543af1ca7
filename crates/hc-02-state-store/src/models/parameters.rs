//! `system_parameters` table.

use crate::domain::tables::Tables;
use crate::service::DbTransaction;
use std::collections::BTreeMap;
use std::sync::Arc;

impl Tables {
    pub fn system_parameters(&self) -> &BTreeMap<String, String> {
        &self.system_parameters
    }

    pub fn system_parameter(&self, name: &str) -> Option<&str> {
        self.system_parameters.get(name).map(String::as_str)
    }
}

impl DbTransaction {
    /// Insert or replace one parameter, returning the previous value.
    pub fn set_system_parameter(&mut self, name: &str, value: &str) -> Option<String> {
        Arc::make_mut(&mut self.tables_mut().system_parameters)
            .insert(name.to_string(), value.to_string())
    }

    pub fn delete_system_parameter(&mut self, name: &str) -> Option<String> {
        Arc::make_mut(&mut self.tables_mut().system_parameters).remove(name)
    }

    /// Insert every missing parameter, leaving existing values alone.
    pub fn seed_system_parameters<'a>(&mut self, defaults: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let params = Arc::make_mut(&mut self.tables_mut().system_parameters);
        for (name, value) in defaults {
            params
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
}
