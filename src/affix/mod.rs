//! Storing and loading affixes: parts that can be added to a word, like
//! prefixes and suffixes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::db::{ClientError, GraphQl, Namespace};

pub(crate) mod cmd;


const FIELDS: &str = "id example meaning morpheme tongue type";


#[derive(Debug, thiserror::Error)]
pub(crate) enum AffixError {
    #[error("affix not found")]
    NotFound,

    #[error("affix '{}' already exists (ID {})", .0.morpheme, .0.id)]
    Exists(Box<Affix>),

    #[error("database did not return the ID of the new affix")]
    MissingId,

    #[error("affix query failed")]
    Db(#[from] ClientError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Affix {
    pub(crate) id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) example: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) meaning: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) morpheme: String,
    pub(crate) tongue: Option<Tongue>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub(crate) kinds: Vec<AffixType>,
}

/// An affix that is not stored yet. Serializes as `AddAffixInput`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct NewAffix {
    pub(crate) example: Vec<String>,
    pub(crate) meaning: Vec<String>,
    pub(crate) morpheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tongue: Option<Tongue>,
    #[serde(rename = "type")]
    pub(crate) kinds: Vec<AffixType>,
}

impl NewAffix {
    fn into_affix(self, id: String) -> Affix {
        Affix {
            id,
            example: self.example,
            meaning: self.meaning,
            morpheme: self.morpheme,
            tongue: self.tongue,
            kinds: self.kinds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum Tongue {
    English,
    Spanish,
}

/// Mirrors the `AllowedTypeAffix` enum of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum AffixType {
    Prefix,
    Prefixioid,
    Infix,
    Circumfix,
    Interfix,
    Duplifix,
    Transfix,
    Simulfix,
    Suprafix,
    Disfix,
    Stem,
    Suffix,
    Suffixoid,
    Na,
}

/// Dgraph returns `null` for unset fields, including lists.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}


/// Stores a new affix and returns it with the ID assigned by the database.
/// Fails with `Exists` if an affix with the same morpheme is already stored.
pub(crate) async fn add(db: &impl GraphQl, new: NewAffix) -> Result<Affix, AffixError> {
    if let Some(existing) = find_by_morpheme(db, &new.morpheme).await?.into_iter().next() {
        return Err(AffixError::Exists(Box::new(existing)));
    }

    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "addAffix")]
        add_affix: Option<Payload>,
    }

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "null_as_default")]
        affix: Vec<Created>,
    }

    #[derive(Deserialize)]
    struct Created {
        id: String,
    }

    let document = "mutation addAffix($input: [AddAffixInput!]!) {
        addAffix(input: $input) {
            affix { id }
        }
    }";
    let variables = serde_json::json!({ "input": [&new] });
    let response: Response = db.query(Namespace::Graphql, document, Some(variables)).await?;

    let mut created = response.add_affix.map(|p| p.affix).unwrap_or_default();
    if created.len() != 1 {
        return Err(AffixError::MissingId);
    }

    Ok(new.into_affix(created.remove(0).id))
}

/// Loads the affix with the given ID.
pub(crate) async fn one(db: &impl GraphQl, id: &str) -> Result<Affix, AffixError> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "getAffix")]
        get_affix: Option<Affix>,
    }

    let document = format!("query getAffix($id: ID!) {{ getAffix(id: $id) {{ {FIELDS} }} }}");
    let variables = serde_json::json!({ "id": id });
    let response: Response = db.query(Namespace::Graphql, &document, Some(variables)).await?;

    response.get_affix.ok_or(AffixError::NotFound)
}

/// Loads the affix with the given morpheme. Fails with `NotFound` unless
/// there is exactly one.
pub(crate) async fn one_by_morpheme(db: &impl GraphQl, morpheme: &str) -> Result<Affix, AffixError> {
    let mut affixes = find_by_morpheme(db, morpheme).await?;
    if affixes.len() != 1 {
        return Err(AffixError::NotFound);
    }

    Ok(affixes.remove(0))
}

async fn find_by_morpheme(db: &impl GraphQl, morpheme: &str) -> Result<Vec<Affix>, AffixError> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "queryAffix", default, deserialize_with = "null_as_default")]
        query_affix: Vec<Affix>,
    }

    let document = format!(
        "query queryAffix($morpheme: String!) {{ \
            queryAffix(filter: {{ morpheme: {{ eq: $morpheme }} }}) {{ {FIELDS} }} \
        }}"
    );
    let variables = serde_json::json!({ "morpheme": morpheme });
    let response: Response = db.query(Namespace::Graphql, &document, Some(variables)).await?;

    Ok(response.query_affix)
}
