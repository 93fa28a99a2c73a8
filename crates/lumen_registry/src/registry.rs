//! The device registry.
//!
//! All durable state lives behind this type: pending registrations, active
//! devices, issued tokens, and the feedback archive. Layout and field names
//! are in [`crate::keys`]; the registry never caches, so concurrent access
//! from the HTTP handlers and the control processor always sees store truth.

use std::future::Future;

use tracing::{debug, info, warn};
use uuid::Uuid;

use lumen_interchange::FeedbackMessage;
use lumen_store::KeyValueStore;

use crate::error::RegistryError;
use crate::keys;
use crate::models::{
    permission, RegistrationDetails, RegistrationRequest, TokenDetails, MAX_FEEDBACK_ENTRIES,
    MIN_DEVICE_NAME_LEN, MIN_SHARED_SECRET_LEN,
};
use crate::token::TokenGenerator;

/// The slice of the registry the device control processor depends on.
///
/// The processor only ever verifies that a connection maps to a registered
/// device and archives feedback; keeping the seam this narrow lets its tests
/// run against a two-method stub.
pub trait DeviceIndex: Send + Sync {
    fn find_device(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<RegistrationDetails, RegistryError>> + Send;

    fn log_feedback(
        &self,
        message: &FeedbackMessage,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

/// Registry over a [`KeyValueStore`] backend.
pub struct DeviceRegistry<S> {
    store: S,
    tokens: Box<dyn TokenGenerator>,
}

impl<S: KeyValueStore> DeviceRegistry<S> {
    pub fn new(store: S, tokens: Box<dyn TokenGenerator>) -> Self {
        Self { store, tokens }
    }

    /// Reserve a spot in the registry to be filled once the device connects.
    /// The secret must decode to at least [`MIN_SHARED_SECRET_LEN`] bytes;
    /// undecodable secrets count as empty.
    pub async fn allocate(&self, request: &RegistrationRequest) -> Result<(), RegistryError> {
        let secret_len = hex::decode(&request.shared_secret)
            .map(|bytes| bytes.len())
            .unwrap_or(0);

        if request.name.len() < MIN_DEVICE_NAME_LEN || secret_len < MIN_SHARED_SECRET_LEN {
            return Err(RegistryError::InvalidRegistration);
        }

        let allocation_id = Uuid::new_v4().to_string();
        let key = keys::allocation_key(&allocation_id);

        self.store
            .hmset(
                &key,
                &[
                    (keys::REGISTRATION_NAME_FIELD, request.name.as_str()),
                    (keys::REGISTRATION_SECRET_FIELD, request.shared_secret.as_str()),
                ],
            )
            .await?;

        debug!(name = %request.name, "allocated registration request");
        Ok(())
    }

    /// Search the pending registrations for one matching `secret` and promote
    /// it to an active device under `device_id`.
    pub async fn fill(&self, secret: &str, device_id: &str) -> Result<(), RegistryError> {
        let request_keys = self.store.keys(&keys::allocation_pattern()).await?;

        for key in request_keys {
            let stored = match self.store.hget(&key, keys::REGISTRATION_SECRET_FIELD).await {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(_) => continue,
            };

            if stored == secret {
                debug!(device_id, "found matching secret, filling");
                return self.fill_allocation(&key, device_id).await;
            }
        }

        Err(RegistryError::NotFound)
    }

    /// Whether a pending registration already claims `name`. Used alongside
    /// [`Self::find_device`] to reject duplicate names before a device has
    /// completed its handshake.
    pub async fn allocation_exists(&self, name: &str) -> Result<bool, RegistryError> {
        let request_keys = self.store.keys(&keys::allocation_pattern()).await?;

        for key in request_keys {
            if let Some(stored) = self.store.hget(&key, keys::REGISTRATION_NAME_FIELD).await? {
                if stored == name {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Search the registry for the first device matching `query` by id or
    /// name. Id lookups hit the EXISTS fast path; name lookups fall back to a
    /// key scan, which is fine at fleet sizes this server targets.
    pub async fn find_device(&self, query: &str) -> Result<RegistrationDetails, RegistryError> {
        let device_key = keys::device_key(query);

        if self.store.exists(&device_key).await? {
            return self.load_details(&device_key).await;
        }

        let device_keys = self.store.keys(&keys::device_pattern()).await?;

        for key in device_keys {
            let fields = self
                .hmget_required(
                    &key,
                    &[
                        keys::DEVICE_NAME_FIELD,
                        keys::DEVICE_ID_FIELD,
                        keys::DEVICE_SECRET_FIELD,
                    ],
                )
                .await?;

            if fields[0] == query || fields[1] == query {
                return Ok(RegistrationDetails {
                    name: fields[0].clone(),
                    device_id: fields[1].clone(),
                    shared_secret: fields[2].clone(),
                });
            }
        }

        warn!(query, "did not find matching device");
        Err(RegistryError::NotFound)
    }

    /// Every registered device, in index order.
    pub async fn list_registrations(&self) -> Result<Vec<RegistrationDetails>, RegistryError> {
        let ids = self.store.lrange(keys::DEVICE_INDEX_KEY, 0, -1).await?;
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            results.push(self.load_details(&keys::device_key(&id)).await?);
        }

        Ok(results)
    }

    /// Delete a device and everything hanging off it. The device row, its
    /// feedback, and its index entry must all go; token rows are cleaned
    /// best-effort, but the token list itself must be removed.
    pub async fn remove_device(&self, id: &str) -> Result<(), RegistryError> {
        self.store.del(&keys::device_key(id)).await?;
        self.store.del(&keys::feedback_key(id)).await?;
        self.store.lrem(keys::DEVICE_INDEX_KEY, 1, id).await?;

        info!(device_id = id, "cleaned device from registry");

        let token_list = keys::token_list_key(id);
        let tokens = self.store.lrange(&token_list, 0, -1).await?;

        for token in tokens {
            if let Err(error) = self.store.del(&keys::token_key(&token)).await {
                debug!(%error, "skipping token row during device removal");
            }
        }

        self.store.del(&token_list).await?;
        Ok(())
    }

    /// Mint a new token for a device. The raw token doubles as the storage
    /// key; the permission mask is persisted in base-2 text.
    pub async fn allocate_token(
        &self,
        device_id: &str,
        name: &str,
        permission: u32,
    ) -> Result<TokenDetails, RegistryError> {
        let details = self.find_device(device_id).await?;

        let raw = self.tokens.generate();
        let token_id = Uuid::new_v4().to_string();
        let mask = permission::to_mask_string(permission);

        self.store
            .lpush(&keys::token_list_key(&details.device_id), &raw)
            .await?;

        self.store
            .hmset(
                &keys::token_key(&raw),
                &[
                    (keys::TOKEN_NAME_FIELD, name),
                    (keys::TOKEN_PERMISSION_FIELD, mask.as_str()),
                    (keys::TOKEN_ID_FIELD, token_id.as_str()),
                    (keys::TOKEN_DEVICE_FIELD, details.device_id.as_str()),
                ],
            )
            .await?;

        debug!(device_id = %details.device_id, token_id = %token_id, "created device token");

        Ok(TokenDetails {
            token_id,
            device_id: details.device_id,
            token: raw,
            name: name.to_string(),
            permission,
        })
    }

    /// Approve `token` for `required` permissions on the given device. The
    /// device's own shared secret authorizes everything; issued tokens must
    /// carry every requested bit.
    pub async fn authorize_token(&self, device_id: &str, token: &str, required: u32) -> bool {
        let registration = match self.find_device(device_id).await {
            Ok(details) => details,
            Err(_) => return false,
        };

        if token == registration.shared_secret {
            return true;
        }

        let requester = match self.find_token(token).await {
            Ok(details) => details,
            Err(error) => {
                warn!(%error, "unable to find token during authorization");
                return false;
            }
        };

        debug!(
            token_id = %requester.token_id,
            granted = format_args!("{:b}", requester.permission),
            requested = format_args!("{:b}", required),
            "authorizing token"
        );

        permission::satisfies(requester.permission, required)
    }

    /// Look up an issued token by its raw value.
    pub async fn find_token(&self, token: &str) -> Result<TokenDetails, RegistryError> {
        let key = keys::token_key(token);

        let mask = self
            .store
            .hget(&key, keys::TOKEN_PERMISSION_FIELD)
            .await?
            .ok_or(RegistryError::NotFound)?;

        let permission = permission::from_mask_string(&mask).ok_or_else(|| {
            RegistryError::BadStoreResponse(format!("invalid permission mask '{}'", mask))
        })?;

        let fields = self
            .hmget_required(
                &key,
                &[
                    keys::TOKEN_ID_FIELD,
                    keys::TOKEN_NAME_FIELD,
                    keys::TOKEN_DEVICE_FIELD,
                ],
            )
            .await?;

        Ok(TokenDetails {
            token_id: fields[0].clone(),
            name: fields[1].clone(),
            device_id: fields[2].clone(),
            token: token.to_string(),
            permission,
        })
    }

    /// Every token issued for a device. Rows that fail to load or carry an
    /// unparseable mask are skipped, so the result may be shorter than the
    /// token list.
    pub async fn list_tokens(&self, device_id: &str) -> Result<Vec<TokenDetails>, RegistryError> {
        let details = self.find_device(device_id).await?;
        let raws = self
            .store
            .lrange(&keys::token_list_key(&details.device_id), 0, -1)
            .await?;

        let mut results = Vec::with_capacity(raws.len());

        for raw in raws {
            let fields = match self
                .store
                .hmget(
                    &keys::token_key(&raw),
                    &[
                        keys::TOKEN_ID_FIELD,
                        keys::TOKEN_NAME_FIELD,
                        keys::TOKEN_DEVICE_FIELD,
                        keys::TOKEN_PERMISSION_FIELD,
                    ],
                )
                .await
            {
                Ok(fields) => fields,
                Err(error) => {
                    debug!(%error, "skipping unreadable token row");
                    continue;
                }
            };

            let loaded: Option<Vec<String>> = fields.into_iter().collect();
            let Some(loaded) = loaded else {
                debug!(token = %raw, "skipping incomplete token row");
                continue;
            };

            let Some(parsed) = permission::from_mask_string(&loaded[3]) else {
                debug!(token = %raw, mask = %loaded[3], "skipping token with bad mask");
                continue;
            };

            results.push(TokenDetails {
                token_id: loaded[0].clone(),
                name: loaded[1].clone(),
                device_id: loaded[2].clone(),
                token: raw,
                permission: parsed,
            });
        }

        Ok(results)
    }

    /// Archive a feedback message on its device's bounded ring. When the
    /// ring is full it is trimmed before the insert; a failed trim aborts
    /// the insert so the bound holds.
    pub async fn log_feedback(&self, message: &FeedbackMessage) -> Result<(), RegistryError> {
        let auth = message
            .authentication
            .as_ref()
            .ok_or(RegistryError::BadInterchangeAuthentication)?;

        let details = self.find_device(&auth.device_id).await?;
        let feedback_key = keys::feedback_key(&details.device_id);

        let count = self.store.llen(&feedback_key).await?;

        if count >= MAX_FEEDBACK_ENTRIES {
            warn!(
                key = %feedback_key,
                max = MAX_FEEDBACK_ENTRIES,
                "feedback stack exceeds max entries, trimming"
            );
            self.store
                .ltrim(&feedback_key, 0, MAX_FEEDBACK_ENTRIES as isize - 2)
                .await?;
        }

        let text = lumen_interchange::to_text(message)
            .map_err(|e| RegistryError::BadInterchangeData(e.to_string()))?;

        self.store.lpush(&feedback_key, &text).await?;

        debug!(key = %feedback_key, "logged feedback for device");
        Ok(())
    }

    /// The latest feedback entries for a device, newest first.
    pub async fn list_feedback(
        &self,
        id: &str,
        count: usize,
    ) -> Result<Vec<FeedbackMessage>, RegistryError> {
        let details = self.find_device(id).await?;
        let feedback_key = keys::feedback_key(&details.device_id);

        let list = self.store.lrange(&feedback_key, 0, count as isize).await?;

        if list.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(list.len());

        for entry in &list {
            let message: FeedbackMessage = lumen_interchange::from_text(entry)
                .map_err(|e| RegistryError::BadInterchangeData(e.to_string()))?;
            results.push(message);
        }

        debug!(
            key = %feedback_key,
            found = list.len(),
            "loaded feedback entries"
        );
        Ok(results)
    }

    /// Promote a pending allocation into an active device: index entry plus
    /// device row, then a deferred best-effort delete of the request row.
    async fn fill_allocation(&self, request_key: &str, device_id: &str) -> Result<(), RegistryError> {
        let request = self.load_request(request_key).await?;

        self.store.lpush(keys::DEVICE_INDEX_KEY, device_id).await?;

        self.store
            .hmset(
                &keys::device_key(device_id),
                &[
                    (keys::DEVICE_ID_FIELD, device_id),
                    (keys::DEVICE_NAME_FIELD, request.name.as_str()),
                    (keys::DEVICE_SECRET_FIELD, request.shared_secret.as_str()),
                ],
            )
            .await?;

        info!(name = %request.name, device_id, "filled device registry");

        // The insert stands even if the request row lingers.
        if let Err(error) = self.store.del(request_key).await {
            warn!(%error, key = request_key, "unable to delete filled registration request");
        }

        Ok(())
    }

    async fn load_details(&self, device_key: &str) -> Result<RegistrationDetails, RegistryError> {
        let values = self
            .store
            .hmget(
                device_key,
                &[
                    keys::DEVICE_ID_FIELD,
                    keys::DEVICE_NAME_FIELD,
                    keys::DEVICE_SECRET_FIELD,
                ],
            )
            .await?;

        let loaded: Option<Vec<String>> = values.into_iter().collect();
        let loaded = loaded.filter(|fields| fields.iter().all(|value| !value.is_empty()));

        match loaded {
            Some(fields) => Ok(RegistrationDetails {
                device_id: fields[0].clone(),
                name: fields[1].clone(),
                shared_secret: fields[2].clone(),
            }),
            None => Err(RegistryError::InvalidDevice),
        }
    }

    async fn load_request(&self, request_key: &str) -> Result<RegistrationRequest, RegistryError> {
        let values = self
            .store
            .hmget(
                request_key,
                &[keys::REGISTRATION_SECRET_FIELD, keys::REGISTRATION_NAME_FIELD],
            )
            .await?;

        let loaded: Option<Vec<String>> = values.into_iter().collect();
        let loaded = loaded.filter(|fields| fields.iter().all(|value| !value.is_empty()));

        match loaded {
            Some(fields) => Ok(RegistrationRequest {
                shared_secret: fields[0].clone(),
                name: fields[1].clone(),
            }),
            None => Err(RegistryError::InvalidRequest),
        }
    }

    async fn hmget_required(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<Vec<String>, RegistryError> {
        let values = self.store.hmget(key, fields).await?;

        let mut loaded = Vec::with_capacity(values.len());
        for (value, field) in values.into_iter().zip(fields) {
            match value {
                Some(value) if !value.is_empty() => loaded.push(value),
                _ => {
                    return Err(RegistryError::BadStoreResponse(format!(
                        "missing field {} at {}",
                        field, key
                    )))
                }
            }
        }

        Ok(loaded)
    }
}

impl<S: KeyValueStore> DeviceIndex for DeviceRegistry<S> {
    async fn find_device(&self, query: &str) -> Result<RegistrationDetails, RegistryError> {
        DeviceRegistry::find_device(self, query).await
    }

    async fn log_feedback(&self, message: &FeedbackMessage) -> Result<(), RegistryError> {
        DeviceRegistry::log_feedback(self, message).await
    }
}

// Shared ownership of the registry keeps the index contract.
impl<T: DeviceIndex> DeviceIndex for std::sync::Arc<T> {
    async fn find_device(&self, query: &str) -> Result<RegistrationDetails, RegistryError> {
        self.as_ref().find_device(query).await
    }

    async fn log_feedback(&self, message: &FeedbackMessage) -> Result<(), RegistryError> {
        self.as_ref().log_feedback(message).await
    }
}
