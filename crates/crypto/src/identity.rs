//! Participant identities.
//!
//! An [`Identity`] owns one keypair and, once the controller has fixed the
//! round's ring, its position in that ring. The published ring only ever
//! holds public keys; the private exponent stays in the identity.

use auction_types::Address;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};
use crate::ring::{self, Ring};

/// A fixed ring together with the owner's index in it.
#[derive(Clone, Debug)]
pub struct RingMembership {
    ring: Ring,
    position: usize,
}

impl RingMembership {
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Keypair plus ring bookkeeping for one participant.
#[derive(Clone, Debug)]
pub struct Identity {
    keypair: KeyPair,
    membership: Option<RingMembership>,
}

impl Identity {
    /// Create an identity with a fresh keypair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Result<Self, CryptoError> {
        Ok(Self::from_keypair(KeyPair::generate(rng, bits)?))
    }

    pub fn from_keypair(keypair: KeyPair) -> Self {
        Self {
            keypair,
            membership: None,
        }
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keypair.public_key()
    }

    /// Bulletin-board address derived from the public key.
    pub fn address(&self) -> Result<Address, CryptoError> {
        self.public_key().address()
    }

    /// Fix the ring used by [`Identity::sign`]. Returns the own position.
    pub fn assign_ring(&mut self, ring: Ring) -> Result<usize, CryptoError> {
        let position = ring.position(self.public_key()).ok_or_else(|| {
            CryptoError::InvalidArgument("own public key is not a ring member".into())
        })?;
        debug!(position, ring_size = ring.len(), "Ring assigned");
        self.membership = Some(RingMembership { ring, position });
        Ok(position)
    }

    pub fn membership(&self) -> Option<&RingMembership> {
        self.membership.as_ref()
    }

    /// Ring-sign `msg` over the assigned ring.
    pub fn sign<R: RngCore + CryptoRng>(
        &self,
        msg: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, CryptoError> {
        let membership = self
            .membership
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidArgument("no ring assigned".into()))?;
        ring::sign(&membership.ring, membership.position, &self.keypair, msg, rng)
    }

    /// Ring-sign `msg` over an explicit ring that contains the own key.
    pub fn sign_with<R: RngCore + CryptoRng>(
        &self,
        ring: &Ring,
        msg: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, CryptoError> {
        let position = ring.position(self.public_key()).ok_or_else(|| {
            CryptoError::InvalidArgument("own public key is not a ring member".into())
        })?;
        ring::sign(ring, position, &self.keypair, msg, rng)
    }

    /// Stateless ring-signature verification.
    pub fn verify(msg: &[u8], signature: &[u8], ring: &Ring) -> Result<bool, CryptoError> {
        ring::verify(ring, msg, signature)
    }
}

/// Capabilities shared by the bidder and the auctioneer.
pub trait Participant {
    fn identity(&self) -> &Identity;

    fn public_key(&self) -> &PublicKey {
        self.identity().public_key()
    }

    fn address(&self) -> Result<Address, CryptoError> {
        self.identity().address()
    }

    fn sign<R: RngCore + CryptoRng>(&self, msg: &[u8], rng: &mut R) -> Result<Vec<u8>, CryptoError> {
        self.identity().sign(msg, rng)
    }

    fn verify(&self, msg: &[u8], signature: &[u8], ring: &Ring) -> Result<bool, CryptoError> {
        Identity::verify(msg, signature, ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn identities(count: usize) -> Vec<Identity> {
        (0..count)
            .map(|_| Identity::generate(&mut OsRng, 1024).unwrap())
            .collect()
    }

    fn ring_of(ids: &[Identity]) -> Ring {
        Ring::new(ids.iter().map(|id| id.public_key().clone()).collect()).unwrap()
    }

    #[test]
    fn test_sign_requires_ring() {
        let ids = identities(1);
        assert!(matches!(
            ids[0].sign(b"msg", &mut OsRng),
            Err(CryptoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_assign_ring_and_sign() {
        let mut ids = identities(3);
        let ring = ring_of(&ids);

        assert_eq!(ids[1].assign_ring(ring.clone()).unwrap(), 1);
        assert_eq!(ids[1].membership().unwrap().position(), 1);

        let sig = ids[1].sign(b"msg", &mut OsRng).unwrap();
        assert!(Identity::verify(b"msg", &sig, &ring).unwrap());
    }

    #[test]
    fn test_assign_foreign_ring_fails() {
        let mut ids = identities(3);
        let ring = ring_of(&ids[..2]);
        assert!(ids[2].assign_ring(ring).is_err());
        assert!(ids[2].membership().is_none());
    }

    #[test]
    fn test_sign_with_designated_verifier_ring() {
        let ids = identities(2);
        let pair = ring_of(&ids);
        let sig = ids[0].sign_with(&pair, b"bound", &mut OsRng).unwrap();
        assert!(Identity::verify(b"bound", &sig, &pair).unwrap());
    }

    #[test]
    fn test_addresses_are_distinct() {
        let ids = identities(2);
        assert_ne!(ids[0].address().unwrap(), ids[1].address().unwrap());
    }
}
