//! Implementation of the Record derive macro.
//!
//! Parses `#[record(...)]` attributes on the struct and its fields, then
//! emits an `impl ::sqlbase::Record` with static column, constraint and
//! relationship metadata plus dynamic column accessors.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Path, Result, Token, Type};

/// Parsed definition of a struct with `#[derive(Record)]`.
#[derive(Debug)]
pub struct RecordDef {
    /// The struct name.
    pub name: Ident,
    /// Table name, explicit or derived from the struct name.
    pub table: String,
    /// The field holding `RecordMeta`.
    pub meta_field: Ident,
    /// Persisted columns, in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Multi-column unique constraints.
    pub uniques: Vec<UniqueDef>,
    /// Relationships.
    pub relations: Vec<RelationDef>,
}

/// A persisted field.
#[derive(Debug)]
pub struct ColumnDef {
    /// Field (and column) name.
    pub name: Ident,
    /// Rust type.
    pub ty: Type,
    /// Single-column unique flag.
    pub unique: bool,
}

/// `#[record(unique(name = "...", columns("a", "b")))]`.
#[derive(Debug)]
pub struct UniqueDef {
    /// Constraint name.
    pub name: String,
    /// Covered columns.
    pub columns: Vec<String>,
}

/// Direction of a declared relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `belongs_to(...)`
    BelongsTo,
    /// `has_many(...)`
    HasMany,
}

/// `#[record(belongs_to(...))]` or `#[record(has_many(...))]`.
#[derive(Debug)]
pub struct RelationDef {
    /// Direction.
    pub kind: RelationKind,
    /// Relationship name.
    pub name: String,
    /// Related record type.
    pub target: Path,
    /// Foreign key column.
    pub column: String,
    /// ON DELETE action (`belongs_to` only).
    pub on_delete: Option<Ident>,
}

/// Parse a `DeriveInput` into a `RecordDef`.
pub fn parse_record(input: &DeriveInput) -> Result<RecordDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Record requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not unions",
            ));
        }
    };

    let mut table = None;
    let mut uniques = Vec::new();
    let mut relations = Vec::new();

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                table = Some(lit.value());
            } else if path.is_ident("unique") {
                let mut name = None;
                let mut columns = Vec::new();
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("name") {
                        let lit: LitStr = inner.value()?.parse()?;
                        name = Some(lit.value());
                    } else if inner.path.is_ident("columns") {
                        let content;
                        syn::parenthesized!(content in inner.input);
                        let lits = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                        columns = lits.iter().map(LitStr::value).collect();
                    } else {
                        return Err(inner.error("expected `name` or `columns`"));
                    }
                    Ok(())
                })?;
                let name = name.ok_or_else(|| meta.error("unique constraint requires `name`"))?;
                if columns.is_empty() {
                    return Err(meta.error("unique constraint requires `columns(...)`"));
                }
                uniques.push(UniqueDef { name, columns });
            } else if path.is_ident("belongs_to") || path.is_ident("has_many") {
                let kind = if path.is_ident("belongs_to") {
                    RelationKind::BelongsTo
                } else {
                    RelationKind::HasMany
                };
                let mut name = None;
                let mut target = None;
                let mut column = None;
                let mut on_delete = None;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("name") {
                        let lit: LitStr = inner.value()?.parse()?;
                        name = Some(lit.value());
                    } else if inner.path.is_ident("target") {
                        target = Some(inner.value()?.parse::<Path>()?);
                    } else if inner.path.is_ident("column") {
                        let lit: LitStr = inner.value()?.parse()?;
                        column = Some(lit.value());
                    } else if inner.path.is_ident("on_delete") && kind == RelationKind::BelongsTo {
                        let lit: LitStr = inner.value()?.parse()?;
                        on_delete = Some(parse_referential_action(&lit)?);
                    } else {
                        return Err(inner.error(
                            "expected `name`, `target`, `column` or (belongs_to only) `on_delete`",
                        ));
                    }
                    Ok(())
                })?;
                relations.push(RelationDef {
                    kind,
                    name: name.ok_or_else(|| meta.error("relationship requires `name`"))?,
                    target: target.ok_or_else(|| meta.error("relationship requires `target`"))?,
                    column: column.ok_or_else(|| meta.error("relationship requires `column`"))?,
                    on_delete,
                });
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown record attribute `{attr_name}`. \
                         Valid attributes are: table, unique, belongs_to, has_many"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    let mut meta_field = None;
    let mut columns = Vec::new();
    for field in fields {
        match parse_field(field)? {
            FieldRole::Meta(ident) => {
                if meta_field.is_some() {
                    return Err(Error::new_spanned(field, "only one field may be `#[record(meta)]`"));
                }
                meta_field = Some(ident);
            }
            FieldRole::Skip => {}
            FieldRole::Column(col) => columns.push(col),
        }
    }

    let meta_field = meta_field.ok_or_else(|| {
        Error::new_spanned(
            &input.ident,
            "Record requires a `#[record(meta)] meta: RecordMeta` field",
        )
    })?;

    for col in &columns {
        let name = col.name.to_string();
        if matches!(name.as_str(), "id" | "createdts" | "updatedts") {
            return Err(Error::new_spanned(
                &col.name,
                format!("`{name}` is provided by the meta field and cannot be declared"),
            ));
        }
    }
    let known: Vec<String> = columns.iter().map(|c| c.name.to_string()).collect();
    for uc in &uniques {
        for c in &uc.columns {
            if !known.contains(c) {
                return Err(Error::new_spanned(
                    &input.ident,
                    format!("unique constraint `{}` names unknown column `{c}`", uc.name),
                ));
            }
        }
    }
    for rel in &relations {
        if rel.kind == RelationKind::BelongsTo && !known.contains(&rel.column) {
            return Err(Error::new_spanned(
                &rel.target,
                format!("belongs_to `{}` names unknown column `{}`", rel.name, rel.column),
            ));
        }
    }

    Ok(RecordDef {
        name: input.ident.clone(),
        table: table.unwrap_or_else(|| to_snake_case(&input.ident.to_string())),
        meta_field,
        columns,
        uniques,
        relations,
    })
}

enum FieldRole {
    Meta(Ident),
    Skip,
    Column(ColumnDef),
}

fn parse_field(field: &Field) -> Result<FieldRole> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut is_meta = false;
    let mut skip = false;
    let mut unique = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("meta") {
                is_meta = true;
            } else if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("unique") {
                unique = true;
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    &meta.path,
                    format!(
                        "unknown record field attribute `{attr_name}`. \
                         Valid attributes are: meta, skip, unique"
                    ),
                ));
            }
            Ok(())
        })?;
    }

    if is_meta {
        Ok(FieldRole::Meta(name))
    } else if skip {
        Ok(FieldRole::Skip)
    } else {
        Ok(FieldRole::Column(ColumnDef {
            name,
            ty: field.ty.clone(),
            unique,
        }))
    }
}

fn parse_referential_action(lit: &LitStr) -> Result<Ident> {
    let variant = match lit.value().to_uppercase().replace('_', " ").as_str() {
        "NO ACTION" => "NoAction",
        "RESTRICT" => "Restrict",
        "CASCADE" => "Cascade",
        "SET NULL" => "SetNull",
        "SET DEFAULT" => "SetDefault",
        _ => {
            return Err(Error::new_spanned(
                lit,
                "expected one of: NO ACTION, RESTRICT, CASCADE, SET NULL, SET DEFAULT",
            ));
        }
    };
    Ok(Ident::new(variant, lit.span()))
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Generate the Record trait implementation.
pub fn generate_record_impl(def: &RecordDef) -> TokenStream {
    let name = &def.name;
    let table = &def.table;
    let meta_field = &def.meta_field;
    let field_count = def.columns.len() + 3;

    let field_infos = def.columns.iter().map(|col| {
        let col_name = col.name.to_string();
        let ty = &col.ty;
        let unique = col.unique;
        let reference = def
            .relations
            .iter()
            .find(|r| r.kind == RelationKind::BelongsTo && r.column == col_name)
            .map(|r| {
                let target = &r.target;
                let on_delete = r.on_delete.as_ref().map(|action| {
                    quote! { .on_delete(::sqlbase::ReferentialAction::#action) }
                });
                quote! {
                    .references(<#target as ::sqlbase::Record>::TABLE_NAME)
                    #on_delete
                }
            });
        quote! {
            ::sqlbase::FieldInfo::new(#col_name, <#ty as ::sqlbase::SqlTyped>::SQL_TYPE)
                .nullable(<#ty as ::sqlbase::SqlTyped>::NULLABLE)
                .unique(#unique)
                #reference
        }
    });

    let unique_count = def.uniques.len();
    let unique_infos = def.uniques.iter().map(|uc| {
        let uc_name = &uc.name;
        let cols = &uc.columns;
        quote! { ::sqlbase::UniqueConstraint::new(#uc_name, &[#(#cols),*]) }
    });

    let relation_count = def.relations.len();
    let relation_infos = def.relations.iter().map(|rel| {
        let rel_name = &rel.name;
        let column = &rel.column;
        let target = &rel.target;
        let kind = match rel.kind {
            RelationKind::BelongsTo => quote! { ::sqlbase::RelationshipKind::BelongsTo },
            RelationKind::HasMany => quote! { ::sqlbase::RelationshipKind::HasMany },
        };
        quote! {
            ::sqlbase::RelationshipInfo::new(
                #rel_name,
                #kind,
                #column,
                <#target as ::sqlbase::Record>::TABLE_NAME,
            )
        }
    });

    let getters = def.columns.iter().map(|col| {
        let ident = &col.name;
        let col_name = ident.to_string();
        quote! {
            #col_name => ::core::option::Option::Some(
                ::sqlbase::Value::from(::core::clone::Clone::clone(&self.#ident))
            ),
        }
    });

    let setters = def.columns.iter().map(|col| {
        let ident = &col.name;
        let ty = &col.ty;
        let col_name = ident.to_string();
        quote! {
            #col_name => {
                self.#ident = <#ty as ::sqlbase::FromValue>::from_value(value)
                    .map_err(|e| e.in_column(#col_name))?;
            }
        }
    });

    let uniques_fn = (unique_count > 0).then(|| {
        quote! {
            fn unique_constraints() -> &'static [::sqlbase::UniqueConstraint] {
                static UNIQUES: [::sqlbase::UniqueConstraint; #unique_count] = [#(#unique_infos),*];
                &UNIQUES
            }
        }
    });

    let relations_fn = (relation_count > 0).then(|| {
        let arms = def.relations.iter().map(|rel| {
            let rel_name = &rel.name;
            let target = &rel.target;
            quote! {
                #rel_name => ::core::option::Option::Some(visitor.visit::<#target>()),
            }
        });
        quote! {
            fn relationships() -> &'static [::sqlbase::RelationshipInfo] {
                static RELATIONSHIPS: [::sqlbase::RelationshipInfo; #relation_count] =
                    [#(#relation_infos),*];
                &RELATIONSHIPS
            }

            fn visit_related<V: ::sqlbase::RelatedVisitor>(
                name: &str,
                visitor: V,
            ) -> ::core::option::Option<V::Output> {
                match name {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    });

    quote! {
        impl ::sqlbase::Record for #name {
            const TABLE_NAME: &'static str = #table;

            fn fields() -> &'static [::sqlbase::FieldInfo] {
                static FIELDS: [::sqlbase::FieldInfo; #field_count] = [
                    ::sqlbase::FieldInfo::ID,
                    ::sqlbase::FieldInfo::CREATEDTS,
                    ::sqlbase::FieldInfo::UPDATEDTS,
                    #(#field_infos),*
                ];
                &FIELDS
            }

            #uniques_fn

            #relations_fn

            fn meta(&self) -> &::sqlbase::RecordMeta {
                &self.#meta_field
            }

            fn meta_mut(&mut self) -> &mut ::sqlbase::RecordMeta {
                &mut self.#meta_field
            }

            fn get_value(&self, column: &str) -> ::core::option::Option<::sqlbase::Value> {
                if let ::core::option::Option::Some(value) = self.#meta_field.get_value(column) {
                    return ::core::option::Option::Some(value);
                }
                match column {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_value(&mut self, column: &str, value: ::sqlbase::Value) -> ::sqlbase::Result<()> {
                if ::sqlbase::RecordMeta::is_meta_column(column) {
                    return self.#meta_field.set_value(column, value);
                }
                match column {
                    #(#setters)*
                    _ => {
                        return ::core::result::Result::Err(
                            ::sqlbase::Error::unknown_field(#table, column),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_full_definition() {
        let input: DeriveInput = parse_quote! {
            #[record(table = "cars")]
            #[record(unique(name = "uidx_car_makemodel", columns("make", "model")))]
            #[record(belongs_to(name = "owner", target = Person, column = "owner_id", on_delete = "set null"))]
            struct Car {
                #[record(meta)]
                meta: RecordMeta,
                make: String,
                model: String,
                #[record(unique)]
                vin: Option<String>,
                owner_id: Option<i64>,
                #[record(skip)]
                scratch: u8,
            }
        };
        let def = parse_record(&input).unwrap();
        assert_eq!(def.table, "cars");
        assert_eq!(def.meta_field, "meta");
        assert_eq!(def.columns.len(), 4);
        assert!(def.columns[2].unique);
        assert_eq!(def.uniques[0].columns, vec!["make", "model"]);
        assert_eq!(def.relations[0].kind, RelationKind::BelongsTo);
        assert_eq!(def.relations[0].on_delete.as_ref().unwrap(), "SetNull");
    }

    #[test]
    fn test_table_name_defaults_to_snake_case() {
        let input: DeriveInput = parse_quote! {
            struct BlogPost {
                #[record(meta)]
                meta: RecordMeta,
                title: String,
            }
        };
        assert_eq!(parse_record(&input).unwrap().table, "blog_post");
    }

    #[test]
    fn test_missing_meta_field_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Bare {
                title: String,
            }
        };
        let err = parse_record(&input).unwrap_err();
        assert!(err.to_string().contains("#[record(meta)]"));
    }

    #[test]
    fn test_unique_on_unknown_column_is_rejected() {
        let input: DeriveInput = parse_quote! {
            #[record(unique(name = "u", columns("nope")))]
            struct Thing {
                #[record(meta)]
                meta: RecordMeta,
                title: String,
            }
        };
        assert!(parse_record(&input).is_err());
    }

    #[test]
    fn test_reserved_column_names_are_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Thing {
                #[record(meta)]
                meta: RecordMeta,
                id: i64,
            }
        };
        assert!(parse_record(&input).is_err());
    }

    #[test]
    fn test_generated_impl_mentions_static_metadata() {
        let input: DeriveInput = parse_quote! {
            #[record(has_many(name = "cars", target = Car, column = "owner_id"))]
            struct Person {
                #[record(meta)]
                meta: RecordMeta,
                name: String,
            }
        };
        let tokens = generate_record_impl(&parse_record(&input).unwrap()).to_string();
        assert!(tokens.contains("TABLE_NAME"));
        assert!(tokens.contains("RELATIONSHIPS"));
        assert!(tokens.contains("visit_related"));
        assert!(!tokens.contains("UNIQUES"));
    }
}
