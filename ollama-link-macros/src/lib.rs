use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Error, Fields};

/// Implements `crate::types::FromBytes`, decoding a whole response body with
/// `serde_json`. A body carrying an `"error"` string becomes
/// `Error::Decode(DecodeError::Server(_))`; other failures surface as
/// `Error::Decode(DecodeError::Json(_))`.
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics crate::types::FromBytes for #name #ty_generics #where_clause {
            fn from_bytes(bytes: ::bytes::Bytes) -> crate::Result<Self> {
                let value: ::serde_json::Value = ::serde_json::from_slice(&bytes)
                    .map_err(|e| crate::Error::Decode(crate::DecodeError::Json(e)))?;
                if let Some(message) = value.get("error").and_then(::serde_json::Value::as_str) {
                    return Err(crate::Error::Decode(crate::DecodeError::Server(message.to_string())));
                }
                ::serde_json::from_value(value)
                    .map_err(|e| crate::Error::Decode(crate::DecodeError::Json(e)))
            }
        }
    };
    TokenStream::from(expanded)
}

/// Implements `crate::parser::StreamRecord` for a streamed response whose
/// completion flag is a `done: bool` field.
#[proc_macro_derive(StreamRecord)]
pub fn derive_stream_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_stream_record(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_stream_record(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            name,
            "StreamRecord can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(Error::new_spanned(
            name,
            "StreamRecord requires named fields",
        ));
    };
    let has_done = fields
        .named
        .iter()
        .any(|f| f.ident.as_ref().is_some_and(|ident| ident == "done"));
    if !has_done {
        return Err(Error::new_spanned(
            name,
            "StreamRecord requires a `done: bool` field",
        ));
    }

    Ok(quote! {
        impl #impl_generics crate::parser::StreamRecord for #name #ty_generics #where_clause {
            fn is_done(&self) -> bool {
                self.done
            }
        }
    })
}
