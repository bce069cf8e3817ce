use crate::error::ApiError;
use crate::types::{CreateOutcome, Document, ProfileKey, ProfileTable};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue, Select};
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

type Item = HashMap<String, AttributeValue>;

/// Existence-conditioned CRUD over the two profile tables.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, key: &ProfileKey) -> Result<Option<Document>, ApiError>;

    /// Writes `attributes` only if nothing is stored at `key`.
    async fn create(&self, key: &ProfileKey, attributes: Document)
        -> Result<CreateOutcome, ApiError>;

    /// Merges `attributes` into an existing record and returns the result, or
    /// `None` if there is no record at `key`.
    async fn update(&self, key: &ProfileKey, attributes: Document)
        -> Result<Option<Document>, ApiError>;

    /// Returns false if there was no record at `key`.
    async fn delete(&self, key: &ProfileKey) -> Result<bool, ApiError>;

    async fn scan(&self, table: ProfileTable) -> Result<Vec<Document>, ApiError>;

    /// Every record sharing one partition key value.
    async fn query(&self, table: ProfileTable, partition: &str) -> Result<Vec<Document>, ApiError>;

    async fn count(&self, table: ProfileTable) -> Result<usize, ApiError>;
}

pub struct DynamoProfileStore {
    client: DynamoClient,
    host_profiles_table: String,
    resident_profiles_table: String,
}

impl DynamoProfileStore {
    pub fn new(
        client: DynamoClient,
        host_profiles_table: impl Into<String>,
        resident_profiles_table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            host_profiles_table: host_profiles_table.into(),
            resident_profiles_table: resident_profiles_table.into(),
        }
    }

    fn table_name(&self, table: ProfileTable) -> &str {
        match table {
            ProfileTable::HostProfiles => &self.host_profiles_table,
            ProfileTable::ResidentProfiles => &self.resident_profiles_table,
        }
    }

    /// Conditional update shared by create and update.
    async fn conditional_update(
        &self,
        key: &ProfileKey,
        attributes: Document,
        exists: bool,
    ) -> Result<Option<Document>, ApiError> {
        let mut update = UpdateExpression::from_document(key, &attributes)?;
        let condition = key_condition(key, exists, &mut update.names);

        let result = self
            .client
            .update_item()
            .table_name(self.table_name(key.table()))
            .set_key(Some(key_item(key)))
            .condition_expression(condition)
            .set_update_expression(update.expression)
            .set_expression_attribute_names(Some(update.names))
            .set_expression_attribute_values((!update.values.is_empty()).then_some(update.values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output
                .attributes
                .map(from_item)
                .transpose()
                .map(|record| record.or_else(|| Some(Document::new()))),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(ApiError::from_sdk(err)),
        }
    }
}

/// `SET #key0=:value0, #key1=:value1, ...` for every non-key attribute.
#[derive(Debug, Default)]
struct UpdateExpression {
    expression: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    fn from_document(key: &ProfileKey, attributes: &Document) -> Result<Self, ApiError> {
        let key_names: Vec<&str> = key.attributes().into_iter().map(|(name, _)| name).collect();
        let mut update = UpdateExpression::default();
        let mut assignments = Vec::new();

        for (i, (name, value)) in attributes
            .iter()
            .filter(|(name, _)| !key_names.contains(&name.as_str()))
            .enumerate()
        {
            assignments.push(format!("#key{i}=:value{i}"));
            update.names.insert(format!("#key{i}"), name.clone());
            update
                .values
                .insert(format!(":value{i}"), to_attribute_value(value)?);
        }

        if !assignments.is_empty() {
            update.expression = Some(format!("SET {}", assignments.join(", ")));
        }
        Ok(update)
    }
}

/// `attribute_exists(#pk) AND attribute_exists(#sk)`, or the `not_exists` form.
fn key_condition(key: &ProfileKey, exists: bool, names: &mut HashMap<String, String>) -> String {
    let function = if exists {
        "attribute_exists"
    } else {
        "attribute_not_exists"
    };
    let table = key.table();
    let schema = [("#pk", Some(table.partition_key())), ("#sk", table.sort_key())];

    schema
        .into_iter()
        .filter_map(|(placeholder, name)| {
            let name = name?;
            names.insert(placeholder.to_string(), name.to_string());
            Some(format!("{function}({placeholder})"))
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn key_item(key: &ProfileKey) -> Item {
    key.attributes()
        .into_iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::S(value.to_string())))
        .collect()
}

fn to_attribute_value(value: &serde_json::Value) -> Result<AttributeValue, ApiError> {
    serde_dynamo::to_attribute_value(value)
        .map_err(|e| ApiError::Internal(format!("failed to encode profile attribute: {}", e)))
}

fn from_item(item: Item) -> Result<Document, ApiError> {
    serde_dynamo::from_item(item)
        .map_err(|e| ApiError::Internal(format!("failed to decode profile record: {}", e)))
}

#[async_trait]
impl ProfileStore for DynamoProfileStore {
    async fn get(&self, key: &ProfileKey) -> Result<Option<Document>, ApiError> {
        let output = self
            .client
            .get_item()
            .table_name(self.table_name(key.table()))
            .set_key(Some(key_item(key)))
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        output.item.map(from_item).transpose()
    }

    async fn create(
        &self,
        key: &ProfileKey,
        attributes: Document,
    ) -> Result<CreateOutcome, ApiError> {
        Ok(match self.conditional_update(key, attributes, false).await? {
            Some(record) => CreateOutcome::Created(record),
            None => CreateOutcome::AlreadyExists,
        })
    }

    async fn update(
        &self,
        key: &ProfileKey,
        attributes: Document,
    ) -> Result<Option<Document>, ApiError> {
        self.conditional_update(key, attributes, true).await
    }

    async fn delete(&self, key: &ProfileKey) -> Result<bool, ApiError> {
        let mut names = HashMap::new();
        let condition = key_condition(key, true, &mut names);

        let result = self
            .client
            .delete_item()
            .table_name(self.table_name(key.table()))
            .set_key(Some(key_item(key)))
            .condition_expression(condition)
            .set_expression_attribute_names(Some(names))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(ApiError::from_sdk(err)),
        }
    }

    async fn scan(&self, table: ProfileTable) -> Result<Vec<Document>, ApiError> {
        let mut records = Vec::new();
        let mut last_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(self.table_name(table))
                .set_exclusive_start_key(last_key.take())
                .send()
                .await
                .map_err(ApiError::from_sdk)?;

            for item in page.items.unwrap_or_default() {
                records.push(from_item(item)?);
            }

            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => last_key = Some(key),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn query(&self, table: ProfileTable, partition: &str) -> Result<Vec<Document>, ApiError> {
        let mut records = Vec::new();
        let mut last_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(self.table_name(table))
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", table.partition_key())
                .expression_attribute_values(":pk", AttributeValue::S(partition.to_string()))
                .set_exclusive_start_key(last_key.take())
                .send()
                .await
                .map_err(ApiError::from_sdk)?;

            for item in page.items.unwrap_or_default() {
                records.push(from_item(item)?);
            }

            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => last_key = Some(key),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn count(&self, table: ProfileTable) -> Result<usize, ApiError> {
        let mut count = 0;
        let mut last_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(self.table_name(table))
                .select(Select::Count)
                .set_exclusive_start_key(last_key.take())
                .send()
                .await
                .map_err(ApiError::from_sdk)?;

            count += usize::try_from(page.count).unwrap_or_default();

            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => last_key = Some(key),
                _ => break,
            }
        }

        Ok(count)
    }
}
